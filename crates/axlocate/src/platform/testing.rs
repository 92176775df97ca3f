/*!
Scripted in-memory provider for tests.

Serves a mutable raw tree, honours depth limits and attribute requests the way a
real provider would, and counts every call so tests can assert on provider traffic.
*/

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use super::{AccessibilityProvider, ProviderError, RawNode};
use crate::a11y::{Attribute, AttributeSet, ElementType};
use crate::types::{Frame, NativeRef};

pub(crate) const PID: u32 = 100;

/// Leaf node with a type, label and frame.
pub(crate) fn node(element: u64, ty: ElementType, label: &str) -> RawNode {
  #[allow(clippy::cast_precision_loss)]
  let offset = element as f64 * 10.0;
  RawNode {
    native: NativeRef::new(PID, element),
    element_type: Some(ty),
    frame: Some(Frame::new(offset, offset, 100.0, 40.0)),
    label: Some(label.to_owned()),
    name: Some(label.to_owned()),
    value: None,
    enabled: Some(true),
    visible: Some(true),
    selected: Some(false),
    accessible: None,
    accessibility_container: None,
    focused: None,
    traits: Some(0),
    children: Some(Vec::new()),
  }
}

pub(crate) fn with_children(mut parent: RawNode, children: Vec<RawNode>) -> RawNode {
  parent.children = Some(children);
  parent
}

/// `app(1) -> window(2) -> [Login(3), Cancel(4)]`
pub(crate) fn login_tree() -> RawNode {
  with_children(
    node(1, ElementType::Application, "App"),
    vec![with_children(
      node(2, ElementType::Window, "Main"),
      vec![
        node(3, ElementType::Button, "Login"),
        node(4, ElementType::Button, "Cancel"),
      ],
    )],
  )
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedProvider {
  root: Mutex<RawNode>,
  frame_scripts: Mutex<HashMap<u64, VecDeque<Frame>>>,
  timeouts_remaining: AtomicUsize,
  no_roots: AtomicBool,
  pause: Mutex<Option<Arc<Barrier>>>,
  pub(crate) capture_calls: AtomicUsize,
  pub(crate) root_calls: AtomicUsize,
}

impl ScriptedProvider {
  pub(crate) fn new(root: RawNode) -> Self {
    Self {
      root: Mutex::new(root),
      ..Self::default()
    }
  }

  pub(crate) fn captures(&self) -> usize {
    self.capture_calls.load(Ordering::SeqCst)
  }

  /// Remove a node (and its subtree) from the live tree.
  pub(crate) fn remove(&self, element: u64) {
    fn prune(node: &mut RawNode, element: u64) {
      if let Some(children) = node.children.as_mut() {
        children.retain(|c| c.native.element != element);
        for child in children {
          prune(child, element);
        }
      }
    }
    prune(&mut self.root.lock(), element);
  }

  /// Mutate a live node in place.
  pub(crate) fn update(&self, element: u64, f: impl FnOnce(&mut RawNode)) {
    let mut root = self.root.lock();
    if let Some(node) = find_mut(&mut root, element) {
      f(node);
    }
  }

  /// Successive captures of `element` report these frames, then keep the last.
  pub(crate) fn script_frames(&self, element: u64, frames: impl IntoIterator<Item = Frame>) {
    self
      .frame_scripts
      .lock()
      .insert(element, frames.into_iter().collect());
  }

  /// The next `count` captures fail with a timeout.
  pub(crate) fn time_out_next(&self, count: usize) {
    self.timeouts_remaining.store(count, Ordering::SeqCst);
  }

  /// `list_active_roots` reports no applications from now on.
  pub(crate) fn clear_roots(&self) {
    self.no_roots.store(true, Ordering::SeqCst);
  }

  /// The next capture blocks on the returned barrier twice: once on entry and
  /// once before reading the tree, so a test can act while it is in flight.
  pub(crate) fn pause_next_capture(&self) -> Arc<Barrier> {
    let gate = Arc::new(Barrier::new(2));
    *self.pause.lock() = Some(Arc::clone(&gate));
    gate
  }

  fn next_scripted_frame(&self, element: u64) -> Option<Frame> {
    let mut scripts = self.frame_scripts.lock();
    let queue = scripts.get_mut(&element)?;
    if queue.len() > 1 {
      queue.pop_front()
    } else {
      queue.front().copied()
    }
  }
}

fn find_mut(node: &mut RawNode, element: u64) -> Option<&mut RawNode> {
  if node.native.element == element {
    return Some(node);
  }
  node
    .children
    .as_mut()?
    .iter_mut()
    .find_map(|child| find_mut(child, element))
}

fn find(node: &RawNode, element: u64) -> Option<&RawNode> {
  if node.native.element == element {
    return Some(node);
  }
  node
    .children
    .as_ref()?
    .iter()
    .find_map(|child| find(child, element))
}

fn trim(node: &RawNode, attributes: AttributeSet, depth_left: usize) -> RawNode {
  let keep = |attr: Attribute| attributes.contains(attr);
  RawNode {
    native: node.native,
    element_type: node.element_type.filter(|_| keep(Attribute::Type)),
    frame: node.frame.filter(|_| keep(Attribute::Frame)),
    label: node.label.clone().filter(|_| keep(Attribute::Label)),
    name: node.name.clone().filter(|_| keep(Attribute::Name)),
    value: node.value.clone().filter(|_| keep(Attribute::Value)),
    enabled: node.enabled.filter(|_| keep(Attribute::Enabled)),
    visible: node.visible.filter(|_| keep(Attribute::Visible)),
    selected: node.selected.filter(|_| keep(Attribute::Selected)),
    accessible: node.accessible.filter(|_| keep(Attribute::Accessible)),
    accessibility_container: node
      .accessibility_container
      .filter(|_| keep(Attribute::AccessibilityContainer)),
    focused: node.focused.filter(|_| keep(Attribute::Focused)),
    traits: node.traits.filter(|_| keep(Attribute::Traits)),
    children: if depth_left == 0 {
      None
    } else {
      node.children.as_ref().map(|children| {
        children
          .iter()
          .map(|c| trim(c, attributes, depth_left - 1))
          .collect()
      })
    },
  }
}

impl AccessibilityProvider for ScriptedProvider {
  fn capture_subtree(
    &self,
    target: &NativeRef,
    attributes: AttributeSet,
    max_depth: usize,
    timeout: Duration,
  ) -> Result<RawNode, ProviderError> {
    self.capture_calls.fetch_add(1, Ordering::SeqCst);

    let paused = self.pause.lock().take();
    if let Some(gate) = paused {
      gate.wait();
      gate.wait();
    }

    let pending = self.timeouts_remaining.load(Ordering::SeqCst);
    if pending > 0 {
      self.timeouts_remaining.store(pending - 1, Ordering::SeqCst);
      return Err(ProviderError::Timeout(timeout));
    }

    let scripted = self.next_scripted_frame(target.element);
    let root = self.root.lock();
    let found = find(&root, target.element).ok_or(ProviderError::NotFound)?;
    let mut captured = trim(found, attributes, max_depth);
    if let Some(frame) = scripted.filter(|_| attributes.contains(Attribute::Frame)) {
      captured.frame = Some(frame);
    }
    Ok(captured)
  }

  fn list_active_roots(&self) -> Result<Vec<RawNode>, ProviderError> {
    self.root_calls.fetch_add(1, Ordering::SeqCst);
    if self.no_roots.load(Ordering::SeqCst) {
      return Ok(Vec::new());
    }
    let root = self.root.lock();
    Ok(vec![trim(&root, AttributeSet::all(), 0)])
  }
}
