/*!
Session-scoped element cache.

Maps `NodeIdentity -> ElementHandle` on top of [`LruCache`]. Every mutation goes
through a method that emits the matching [`CacheEvent`].

## Locking

- `store`, `resolve` (recency bump, refresh, stale eviction) and `reset` take the
  write lock.
- `has_identity`, `entries`, `len` take the read lock and never touch recency.
- Provider calls are never made while a lock is held: `resolve` copies the
  cached handle out, captures unlocked, then writes the result back.

## Module Structure

- `lru.rs` - generic bounded LRU map
- `handle.rs` - `ElementHandle`, `HandleKind`, `HandleState`
*/

mod handle;
mod lru;

pub use handle::{ElementHandle, HandleKind, HandleState};
pub use lru::LruCache;

use async_broadcast::Sender;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::platform::AccessibilityProvider;
use crate::snapshot::{capture, CaptureRequest, SnapshotRef};
use crate::types::{CacheEvent, EvictionReason, LocateError, LocateResult, NodeIdentity, Recency};

/// Default upper bound on cached handles.
pub const ELEMENT_CACHE_SIZE: usize = 1024;

/// Identity-keyed cache of element handles for one session.
pub struct ElementCache {
  entries: RwLock<LruCache<NodeIdentity, ElementHandle>>,
  events_tx: Sender<CacheEvent>,
}

impl std::fmt::Debug for ElementCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ElementCache")
      .field("entries", &*self.entries.read())
      .finish_non_exhaustive()
  }
}

impl ElementCache {
  /// # Errors
  ///
  /// `InvalidArgument` if `capacity` is zero.
  pub fn new(capacity: usize, events_tx: Sender<CacheEvent>) -> LocateResult<Self> {
    Ok(Self {
      entries: RwLock::new(LruCache::new(capacity)?),
      events_tx,
    })
  }

  /// Cache a captured node under its identity.
  ///
  /// Returns `None` (and caches nothing) when the node has no identity; the
  /// caller decides whether that matters. May evict an unrelated entry.
  pub fn store(&self, snapshot: &SnapshotRef) -> Option<NodeIdentity> {
    let identity = match snapshot.identity() {
      Ok(identity) => identity,
      Err(e) => {
        log::debug!("not caching node: {e}");
        return None;
      }
    };

    let evicted = self
      .entries
      .write()
      .put(identity, ElementHandle::stable(identity, snapshot.clone()));

    log::debug!("stored element {identity}");
    self.emit(CacheEvent::Stored { identity });
    if let Some((old, _)) = evicted {
      self.emit_evicted(old, EvictionReason::Capacity);
    }
    Some(identity)
  }

  /// Look up a cached handle, re-capturing its node if `recency` demands it.
  ///
  /// A hit always counts as a use (recency bump). With `Recency::Any` the
  /// provider is never called.
  ///
  /// # Errors
  ///
  /// - `InvalidReference` if `identity` was never stored or has been evicted.
  /// - `StaleElement` if the node is gone; the entry is evicted.
  /// - `AccessibilityTimeout` / `Provider` from the capture; the entry is kept.
  ///
  /// An entry removed while the capture ran (reset, stale eviction) stays
  /// removed; the refreshed handle is still returned.
  pub fn resolve<P: AccessibilityProvider + ?Sized>(
    &self,
    provider: &P,
    identity: &NodeIdentity,
    recency: Recency,
    request: &CaptureRequest,
  ) -> LocateResult<ElementHandle> {
    let cached = self
      .entries
      .write()
      .get(identity)
      .cloned()
      .ok_or(LocateError::InvalidReference(*identity))?;

    if cached.age().is_some_and(|age| recency.is_satisfied_by(age)) {
      log::trace!("resolved {identity} from cache");
      return Ok(cached);
    }

    match capture(provider, &identity.native_ref(), request) {
      Ok(tree) => {
        let mut handle = cached;
        handle.refresh(SnapshotRef::root(Arc::new(tree)))?;
        match self.entries.write().get_mut(identity) {
          Some(entry) => {
            *entry = handle.clone();
            log::debug!("refreshed element {identity}");
          }
          None => log::debug!("element {identity} was dropped during refresh, not re-caching"),
        }
        Ok(handle)
      }
      Err(err @ LocateError::StaleElement(_)) => {
        self.evict_stale(identity);
        Err(err)
      }
      Err(err) => Err(err),
    }
  }

  /// Drop the entry for a node the provider reported gone.
  pub(crate) fn evict_stale(&self, identity: &NodeIdentity) {
    if self.entries.write().remove(identity).is_some() {
      log::debug!("element {identity} is stale, evicted");
      self.emit_evicted(*identity, EvictionReason::Stale);
    }
  }

  /// Membership check. No recency bump, no provider call.
  pub fn has_identity(&self, identity: &NodeIdentity) -> bool {
    self.entries.read().contains(identity)
  }

  /// Copies of all cached handles, most recently used first. Does not touch recency.
  pub fn entries(&self) -> Vec<ElementHandle> {
    self.entries.read().values().cloned().collect()
  }

  /// Drop every entry.
  pub fn reset(&self) {
    let dropped = {
      let mut entries = self.entries.write();
      let dropped = entries.len();
      entries.clear();
      dropped
    };
    log::debug!("element cache reset ({dropped} entries dropped)");
    self.emit(CacheEvent::Reset { dropped });
  }

  /// Number of cached handles.
  pub fn len(&self) -> usize {
    self.entries.read().len()
  }

  /// Whether nothing is cached.
  pub fn is_empty(&self) -> bool {
    self.entries.read().is_empty()
  }

  /// Maximum number of cached handles.
  pub fn capacity(&self) -> usize {
    self.entries.read().capacity()
  }

  fn emit_evicted(&self, identity: NodeIdentity, reason: EvictionReason) {
    self.emit(CacheEvent::Evicted { identity, reason });
  }

  fn emit(&self, event: CacheEvent) {
    if let Err(e) = self.events_tx.try_broadcast(event) {
      if e.is_full() {
        log::error!("Cache event channel overflow - events are being dropped.");
      }
    }
  }
}


#[cfg(test)]
mod proptests {
  use super::*;
  use crate::a11y::ElementType;
  use crate::platform::testing::{node, with_children, ScriptedProvider, PID};
  use crate::types::NativeRef;
  use proptest::prelude::*;

  #[derive(Debug, Clone)]
  enum Op {
    Store(u64),
    Resolve(u64),
    EvictStale(u64),
  }

  fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
      (10u64..20).prop_map(Op::Store),
      (10u64..20).prop_map(Op::Resolve),
      (10u64..20).prop_map(Op::EvictStale),
    ]
  }

  fn identity(element: u64) -> NodeIdentity {
    crate::identity::identity_of(&NativeRef::new(PID, element)).unwrap()
  }

  proptest! {
    #[test]
    fn capacity_holds_and_evictions_are_reported(
      capacity in 1usize..6,
      ops in prop::collection::vec(op(), 0..100),
    ) {
      let buttons = (10..20).map(|i| node(i, ElementType::Button, "b")).collect();
      let provider = ScriptedProvider::new(with_children(node(1, ElementType::Window, "w"), buttons));
      let (mut tx, mut rx) = async_broadcast::broadcast(1024);
      tx.set_overflow(true);
      let cache = ElementCache::new(capacity, tx).unwrap();

      for op in ops {
        match op {
          Op::Store(element) => {
            let tree = capture(&provider, &NativeRef::new(PID, element), &CaptureRequest::default()).unwrap();
            prop_assert_eq!(cache.store(&SnapshotRef::root(Arc::new(tree))), Some(identity(element)));
          }
          Op::Resolve(element) => {
            let known = cache.has_identity(&identity(element));
            let resolved = cache.resolve(&provider, &identity(element), Recency::Any, &CaptureRequest::default());
            prop_assert_eq!(resolved.is_ok(), known);
          }
          Op::EvictStale(element) => cache.evict_stale(&identity(element)),
        }

        prop_assert!(cache.len() <= capacity);
        while let Ok(event) = rx.try_recv() {
          if let CacheEvent::Evicted { identity, reason: EvictionReason::Capacity } = event {
            prop_assert!(!cache.has_identity(&identity));
          }
        }
      }
    }
  }
}
