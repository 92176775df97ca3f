/*!
Point-in-time captures of a node and its descendants.

A capture is an arena: every `SnapshotNode` lives in one `SnapshotTree`, children
are referenced by `SnapshotId` and the parent back-reference is an index too, so
there is no owning cycle. Nodes are stored in document (pre-)order, which makes
"first in document order" a plain forward scan.

## Invariants

1. **Immutable**: a tree is never mutated after capture; a re-capture builds a new tree.
2. **Single root**: index 0 is the root and has no parent.
3. **Omitted vs empty**: `children()` is `None` where the depth limit cut the
   tree off and `Some(&[])` for a node that has no children.
*/

mod capture;
mod matching;
mod stability;

pub use capture::{capture, CaptureRequest};
pub use matching::fuzzy_match;
pub use stability::{wait_until_stable, StabilityConfig};

pub(crate) use capture::{DEFAULT_AX_TIMEOUT_MS, DEFAULT_MAX_DEPTH};
pub(crate) use stability::{DEFAULT_FRAME_EPSILON, DEFAULT_POLL_INTERVAL_MS};

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::a11y::{AttributeSet, ElementType};
use crate::identity::identity_of;
use crate::types::{Frame, LocateResult, NativeRef, NodeIdentity};

/// Position of a node inside its `SnapshotTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId(usize);

impl SnapshotId {
  /// The root of every tree.
  pub const ROOT: Self = Self(0);

  /// Document-order position.
  pub const fn index(self) -> usize {
    self.0
  }
}

/// One captured node. Attributes that were not requested are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotNode {
  pub(crate) native: NativeRef,
  pub(crate) element_type: Option<ElementType>,
  pub(crate) frame: Option<Frame>,
  pub(crate) label: Option<String>,
  pub(crate) name: Option<String>,
  pub(crate) value: Option<String>,
  pub(crate) enabled: Option<bool>,
  pub(crate) visible: Option<bool>,
  pub(crate) selected: Option<bool>,
  pub(crate) accessible: Option<bool>,
  pub(crate) accessibility_container: Option<bool>,
  pub(crate) focused: Option<bool>,
  pub(crate) traits: Option<u64>,
  pub(crate) children: Option<Vec<SnapshotId>>,
  pub(crate) parent: Option<SnapshotId>,
  pub(crate) depth: usize,
  pub(crate) index: usize,
}

#[allow(missing_docs)]
impl SnapshotNode {
  pub fn native(&self) -> NativeRef {
    self.native
  }

  pub fn identity(&self) -> LocateResult<NodeIdentity> {
    identity_of(&self.native)
  }

  pub fn element_type(&self) -> Option<ElementType> {
    self.element_type
  }

  pub fn frame(&self) -> Option<Frame> {
    self.frame
  }

  pub fn label(&self) -> Option<&str> {
    self.label.as_deref()
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn value(&self) -> Option<&str> {
    self.value.as_deref()
  }

  pub fn is_enabled(&self) -> Option<bool> {
    self.enabled
  }

  pub fn is_visible(&self) -> Option<bool> {
    self.visible
  }

  pub fn is_selected(&self) -> Option<bool> {
    self.selected
  }

  pub fn is_accessible(&self) -> Option<bool> {
    self.accessible
  }

  /// Whether some descendant, at any depth, is accessible.
  pub fn is_accessibility_container(&self) -> Option<bool> {
    self.accessibility_container
  }

  pub fn is_focused(&self) -> Option<bool> {
    self.focused
  }

  pub fn traits(&self) -> Option<u64> {
    self.traits
  }

  /// `None` when omitted by the depth limit.
  pub fn children(&self) -> Option<&[SnapshotId]> {
    self.children.as_deref()
  }

  pub fn parent(&self) -> Option<SnapshotId> {
    self.parent
  }

  /// Number of ancestors within the capture (root is 0).
  pub fn depth(&self) -> usize {
    self.depth
  }

  /// Position among siblings (root is 0).
  pub fn index(&self) -> usize {
    self.index
  }
}

/// A captured subtree.
#[derive(Clone)]
pub struct SnapshotTree {
  nodes: Vec<SnapshotNode>,
  attributes: AttributeSet,
  max_depth: usize,
  captured_at: Instant,
}

impl SnapshotTree {
  /// Caller guarantees `nodes` is non-empty, in document order, with the root at 0.
  pub(crate) fn from_nodes(nodes: Vec<SnapshotNode>, attributes: AttributeSet, max_depth: usize) -> Self {
    debug_assert!(!nodes.is_empty());
    Self {
      nodes,
      attributes,
      max_depth,
      captured_at: Instant::now(),
    }
  }

  /// The capture target.
  #[allow(clippy::indexing_slicing)] // never empty
  pub fn root(&self) -> &SnapshotNode {
    &self.nodes[0]
  }

  /// `None` if `id` is out of range.
  pub fn node(&self, id: SnapshotId) -> Option<&SnapshotNode> {
    self.nodes.get(id.0)
  }

  /// All nodes in document order.
  pub fn iter(&self) -> impl Iterator<Item = (SnapshotId, &SnapshotNode)> {
    self
      .nodes
      .iter()
      .enumerate()
      .map(|(i, node)| (SnapshotId(i), node))
  }

  /// Ancestors of `id`, nearest first.
  pub fn ancestors(&self, id: SnapshotId) -> impl Iterator<Item = SnapshotId> + '_ {
    std::iter::successors(self.node(id).and_then(SnapshotNode::parent), move |p| {
      self.node(*p).and_then(SnapshotNode::parent)
    })
  }

  /// First node in document order whose native reference matches.
  pub fn find_native(&self, native: &NativeRef) -> Option<SnapshotId> {
    self
      .iter()
      .find(|(_, node)| node.native == *native)
      .map(|(id, _)| id)
  }

  /// Number of captured nodes.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Always `false`: a tree has at least its root.
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Attributes this tree was captured with.
  pub fn attributes(&self) -> AttributeSet {
    self.attributes
  }

  /// Depth limit this tree was captured with.
  pub fn max_depth(&self) -> usize {
    self.max_depth
  }

  /// Time since capture.
  pub fn age(&self) -> Duration {
    self.captured_at.elapsed()
  }
}

impl fmt::Debug for SnapshotTree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SnapshotTree")
      .field("nodes", &self.nodes.len())
      .field("attributes", &self.attributes)
      .field("max_depth", &self.max_depth)
      .finish_non_exhaustive()
  }
}

/// Shared pointer to one node of a captured tree.
///
/// Keeps the whole tree alive so ancestor traversal and fuzzy matching stay
/// possible. Clone is cheap (Arc bump).
#[derive(Clone)]
pub struct SnapshotRef {
  tree: Arc<SnapshotTree>,
  id: SnapshotId,
}

impl SnapshotRef {
  /// Reference to the root of `tree`.
  pub fn root(tree: Arc<SnapshotTree>) -> Self {
    Self {
      tree,
      id: SnapshotId::ROOT,
    }
  }

  /// `None` if `id` does not belong to `tree`.
  pub fn new(tree: Arc<SnapshotTree>, id: SnapshotId) -> Option<Self> {
    (id.0 < tree.len()).then_some(Self { tree, id })
  }

  /// Position of the node in its tree.
  pub fn id(&self) -> SnapshotId {
    self.id
  }

  /// The tree this node was captured in.
  pub fn tree(&self) -> &Arc<SnapshotTree> {
    &self.tree
  }

  /// The referenced node.
  #[allow(clippy::indexing_slicing)] // checked in `new`
  pub fn node(&self) -> &SnapshotNode {
    &self.tree.nodes[self.id.0]
  }

  /// Identity of the referenced node.
  pub fn identity(&self) -> LocateResult<NodeIdentity> {
    self.node().identity()
  }
}

impl fmt::Debug for SnapshotRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("SnapshotRef")
      .field("id", &self.id)
      .field("node", self.node())
      .finish()
  }
}
