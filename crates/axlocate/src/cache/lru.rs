/*!
Fixed-capacity map with least-recently-used eviction.

Entries live in a slot arena linked into a doubly linked recency list by index;
a `HashMap` maps each key to its slot. `get` and `put` are O(1) amortized.

## Invariants

1. **Bounded**: `len() <= capacity()` after every operation.
2. **One slot per key**: re-putting a key replaces its value and promotes it.
3. **Recency is mutation**: `get` moves the entry to the front; `peek`,
   `contains` and `values` do not.
*/

// Slot indices only ever come from `index`, the free list or the recency links.
#![allow(clippy::indexing_slicing)]

use std::collections::HashMap;
use std::hash::Hash;

use crate::types::{LocateError, LocateResult};

const NIL: usize = usize::MAX;

struct Slot<K, V> {
  entry: Option<(K, V)>,
  prev: usize,
  next: usize,
}

/// Bounded map that evicts the least recently used entry on insert.
pub struct LruCache<K, V> {
  index: HashMap<K, usize>,
  slots: Vec<Slot<K, V>>,
  free: Vec<usize>,
  /// Most recently used.
  head: usize,
  /// Least recently used.
  tail: usize,
  capacity: usize,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
  /// # Errors
  ///
  /// `InvalidArgument` if `capacity` is zero.
  pub fn new(capacity: usize) -> LocateResult<Self> {
    if capacity == 0 {
      return Err(LocateError::InvalidArgument(
        "cache capacity must be positive".into(),
      ));
    }
    Ok(Self {
      index: HashMap::with_capacity(capacity),
      slots: Vec::new(),
      free: Vec::new(),
      head: NIL,
      tail: NIL,
      capacity,
    })
  }

  /// Insert or overwrite `key`, making it the most recently used entry.
  ///
  /// Returns the entry evicted to make room, if any.
  pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
    if let Some(&slot) = self.index.get(&key) {
      self.slots[slot].entry = Some((key, value));
      self.promote(slot);
      return None;
    }

    let evicted = if self.index.len() >= self.capacity {
      self.pop_lru()
    } else {
      None
    };

    let slot = self.allocate(key.clone(), value);
    self.push_front(slot);
    self.index.insert(key, slot);
    evicted
  }

  /// Look up `key` and mark it most recently used.
  pub fn get(&mut self, key: &K) -> Option<&V> {
    let slot = *self.index.get(key)?;
    self.promote(slot);
    self.slots[slot].entry.as_ref().map(|(_, v)| v)
  }

  /// Like [`get`](Self::get), with mutable access.
  pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
    let slot = *self.index.get(key)?;
    self.promote(slot);
    self.slots[slot].entry.as_mut().map(|(_, v)| v)
  }

  /// Look up `key` without touching recency.
  pub fn peek(&self, key: &K) -> Option<&V> {
    let slot = *self.index.get(key)?;
    self.slots[slot].entry.as_ref().map(|(_, v)| v)
  }

  /// Whether `key` is present. Does not touch recency.
  pub fn contains(&self, key: &K) -> bool {
    self.index.contains_key(key)
  }

  /// Remove `key`, returning its value.
  pub fn remove(&mut self, key: &K) -> Option<V> {
    let slot = self.index.remove(key)?;
    self.unlink(slot);
    self.release(slot).map(|(_, v)| v)
  }

  /// Values from most to least recently used. Does not touch recency.
  pub fn values(&self) -> impl Iterator<Item = &V> {
    self.iter().map(|(_, v)| v)
  }

  /// Entries from most to least recently used. Does not touch recency.
  pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
    let mut cursor = self.head;
    std::iter::from_fn(move || {
      if cursor == NIL {
        return None;
      }
      let slot = &self.slots[cursor];
      cursor = slot.next;
      slot.entry.as_ref().map(|(k, v)| (k, v))
    })
  }

  /// Number of entries.
  pub fn len(&self) -> usize {
    self.index.len()
  }

  /// Whether the cache holds no entries.
  pub fn is_empty(&self) -> bool {
    self.index.is_empty()
  }

  /// Maximum number of entries.
  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Drop every entry.
  pub fn clear(&mut self) {
    self.index.clear();
    self.slots.clear();
    self.free.clear();
    self.head = NIL;
    self.tail = NIL;
  }

  fn allocate(&mut self, key: K, value: V) -> usize {
    let slot = Slot {
      entry: Some((key, value)),
      prev: NIL,
      next: NIL,
    };
    if let Some(i) = self.free.pop() {
      if let Some(free) = self.slots.get_mut(i) {
        *free = slot;
        return i;
      }
    }
    self.slots.push(slot);
    self.slots.len() - 1
  }

  fn release(&mut self, slot: usize) -> Option<(K, V)> {
    self.free.push(slot);
    self.slots[slot].entry.take()
  }

  fn pop_lru(&mut self) -> Option<(K, V)> {
    if self.tail == NIL {
      return None;
    }
    let slot = self.tail;
    self.unlink(slot);
    let evicted = self.release(slot)?;
    self.index.remove(&evicted.0);
    Some(evicted)
  }

  fn promote(&mut self, slot: usize) {
    if self.head != slot {
      self.unlink(slot);
      self.push_front(slot);
    }
  }

  fn unlink(&mut self, slot: usize) {
    let Slot { prev, next, .. } = self.slots[slot];
    if prev == NIL {
      self.head = next;
    } else {
      self.slots[prev].next = next;
    }
    if next == NIL {
      self.tail = prev;
    } else {
      self.slots[next].prev = prev;
    }
    self.slots[slot].prev = NIL;
    self.slots[slot].next = NIL;
  }

  fn push_front(&mut self, slot: usize) {
    self.slots[slot].prev = NIL;
    self.slots[slot].next = self.head;
    if self.head == NIL {
      self.tail = slot;
    } else {
      self.slots[self.head].prev = slot;
    }
    self.head = slot;
  }
}

impl<K, V> std::fmt::Debug for LruCache<K, V> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("LruCache")
      .field("len", &self.index.len())
      .field("capacity", &self.capacity)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn zero_capacity_is_rejected() {
    assert!(matches!(
      LruCache::<u32, u32>::new(0),
      Err(LocateError::InvalidArgument(_))
    ));
  }

  #[test]
  fn evicts_least_recently_touched() {
    let mut cache = LruCache::new(3).unwrap();
    assert_eq!(cache.put("a", 1), None);
    assert_eq!(cache.put("b", 2), None);
    assert_eq!(cache.put("c", 3), None);
    assert_eq!(cache.put("d", 4), Some(("a", 1)));
    assert!(!cache.contains(&"a"));
    assert_eq!(cache.len(), 3);
  }

  #[test]
  fn get_changes_eviction_order() {
    let mut cache = LruCache::new(3).unwrap();
    cache.put("a", 1);
    cache.put("b", 2);
    cache.put("c", 3);
    assert_eq!(cache.get(&"a"), Some(&1));
    assert_eq!(cache.put("d", 4), Some(("b", 2)));
    assert!(cache.contains(&"a"));
  }

  #[test]
  fn peek_does_not_change_eviction_order() {
    let mut cache = LruCache::new(2).unwrap();
    cache.put("a", 1);
    cache.put("b", 2);
    assert_eq!(cache.peek(&"a"), Some(&1));
    assert_eq!(cache.put("c", 3), Some(("a", 1)));
  }

  #[test]
  fn overwrite_promotes_without_growing() {
    let mut cache = LruCache::new(2).unwrap();
    cache.put("a", 1);
    cache.put("b", 2);
    assert_eq!(cache.put("a", 10), None);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.put("c", 3), Some(("b", 2)));
    assert_eq!(cache.peek(&"a"), Some(&10));
  }

  #[test]
  fn remove_frees_a_slot() {
    let mut cache = LruCache::new(2).unwrap();
    cache.put(1, "one");
    cache.put(2, "two");
    assert_eq!(cache.remove(&1), Some("one"));
    assert_eq!(cache.remove(&1), None);
    assert_eq!(cache.put(3, "three"), None);
    assert_eq!(cache.values().copied().collect::<Vec<_>>(), vec!["three", "two"]);
  }

  #[test]
  fn clear_empties() {
    let mut cache = LruCache::new(2).unwrap();
    cache.put(1, 1);
    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.put(2, 2), None);
    assert_eq!(cache.iter().count(), 1);
  }
}

#[cfg(test)]
mod proptests {
  use super::*;
  use proptest::prelude::*;
  use std::collections::VecDeque;

  #[derive(Debug, Clone)]
  enum Op {
    Put(u8, u32),
    Get(u8),
    Remove(u8),
  }

  fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
      (0u8..16, any::<u32>()).prop_map(|(k, v)| Op::Put(k, v)),
      (0u8..16).prop_map(Op::Get),
      (0u8..16).prop_map(Op::Remove),
    ]
  }

  /// Reference model: front is most recently used.
  fn model_touch(model: &mut VecDeque<(u8, u32)>, key: u8) -> Option<(u8, u32)> {
    let pos = model.iter().position(|(k, _)| *k == key)?;
    let entry = model.remove(pos)?;
    model.push_front(entry);
    Some(entry)
  }

  proptest! {
    #[test]
    fn never_exceeds_capacity(capacity in 1usize..8, ops in prop::collection::vec(op(), 0..200)) {
      let mut cache = LruCache::new(capacity).unwrap();
      for op in ops {
        match op {
          Op::Put(k, v) => { cache.put(k, v); }
          Op::Get(k) => { cache.get(&k); }
          Op::Remove(k) => { cache.remove(&k); }
        }
        prop_assert!(cache.len() <= capacity);
        prop_assert_eq!(cache.iter().count(), cache.len());
      }
    }

    #[test]
    fn matches_reference_model(capacity in 1usize..8, ops in prop::collection::vec(op(), 0..200)) {
      let mut cache = LruCache::new(capacity).unwrap();
      let mut model: VecDeque<(u8, u32)> = VecDeque::new();
      for op in ops {
        match op {
          Op::Put(k, v) => {
            let expected = if model_touch(&mut model, k).is_some() {
              if let Some(front) = model.front_mut() {
                front.1 = v;
              }
              None
            } else {
              let evicted = if model.len() >= capacity { model.pop_back() } else { None };
              model.push_front((k, v));
              evicted
            };
            prop_assert_eq!(cache.put(k, v), expected);
          }
          Op::Get(k) => {
            let expected = model_touch(&mut model, k).map(|(_, v)| v);
            prop_assert_eq!(cache.get(&k).copied(), expected);
          }
          Op::Remove(k) => {
            let expected = model.iter().position(|(mk, _)| *mk == k).and_then(|p| model.remove(p)).map(|(_, v)| v);
            prop_assert_eq!(cache.remove(&k), expected);
          }
        }
        let order: Vec<(u8, u32)> = cache.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(order, model.iter().copied().collect::<Vec<_>>());
      }
    }
  }
}
