/*!
Depth-bounded subtree capture.
*/

use std::time::Duration;

use super::{SnapshotId, SnapshotNode, SnapshotTree};
use crate::a11y::{Attribute, AttributeSet};
use crate::platform::{AccessibilityProvider, RawNode};
use crate::types::{LocateResult, NativeRef};

pub(crate) const DEFAULT_MAX_DEPTH: usize = 50;
pub(crate) const DEFAULT_AX_TIMEOUT_MS: u64 = 10_000;
pub(crate) const DEFAULT_AX_TIMEOUT: Duration = Duration::from_millis(DEFAULT_AX_TIMEOUT_MS);

/// What to fetch from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
  /// Attributes to fetch; the rest stay `None`.
  pub attributes: AttributeSet,
  /// Levels below the target to include; 0 captures the target alone.
  pub max_depth: usize,
  /// Budget for the provider call.
  pub timeout: Duration,
}

impl CaptureRequest {
  /// Request `attributes` down to `max_depth` within `timeout`.
  pub const fn new(attributes: AttributeSet, max_depth: usize, timeout: Duration) -> Self {
    Self {
      attributes,
      max_depth,
      timeout,
    }
  }
}

impl Default for CaptureRequest {
  fn default() -> Self {
    Self::new(AttributeSet::all(), DEFAULT_MAX_DEPTH, DEFAULT_AX_TIMEOUT)
  }
}

/// Capture `target` and its descendants.
///
/// Only provider-backed attributes are requested from the provider. The result is
/// truncated at `max_depth` and masked to the requested attributes even if the
/// provider returns more.
///
/// # Errors
///
/// `AccessibilityTimeout` when the provider exceeds `request.timeout`,
/// `StaleElement` when the target no longer exists.
pub fn capture<P: AccessibilityProvider + ?Sized>(
  provider: &P,
  target: &NativeRef,
  request: &CaptureRequest,
) -> LocateResult<SnapshotTree> {
  let fetched: AttributeSet = request.attributes.iter().filter(|a| a.is_provided()).collect();
  let raw = provider
    .capture_subtree(target, fetched, request.max_depth, request.timeout)
    .map_err(|e| e.for_target(target))?;

  let mut nodes = Vec::new();
  push_subtree(&mut nodes, &raw, request.attributes, request.max_depth, None, 0);
  log::trace!(
    "captured {} nodes under element {} (depth <= {})",
    nodes.len(),
    target.element,
    request.max_depth
  );
  Ok(SnapshotTree::from_nodes(nodes, request.attributes, request.max_depth))
}

/// Append `raw` and its descendants in pre-order. Returns the id of `raw`.
fn push_subtree(
  nodes: &mut Vec<SnapshotNode>,
  raw: &RawNode,
  attributes: AttributeSet,
  max_depth: usize,
  parent: Option<(SnapshotId, usize)>,
  depth: usize,
) -> SnapshotId {
  let keep = |attr: Attribute| attributes.contains(attr);
  let id = SnapshotId(nodes.len());
  nodes.push(SnapshotNode {
    native: raw.native,
    element_type: raw.element_type.filter(|_| keep(Attribute::Type)),
    frame: raw.frame.filter(|_| keep(Attribute::Frame)),
    label: raw.label.clone().filter(|_| keep(Attribute::Label)),
    name: raw.name.clone().filter(|_| keep(Attribute::Name)),
    value: raw.value.clone().filter(|_| keep(Attribute::Value)),
    enabled: raw.enabled.filter(|_| keep(Attribute::Enabled)),
    visible: raw.visible.filter(|_| keep(Attribute::Visible)),
    selected: raw.selected.filter(|_| keep(Attribute::Selected)),
    accessible: raw.accessible.filter(|_| keep(Attribute::Accessible)),
    accessibility_container: raw
      .accessibility_container
      .filter(|_| keep(Attribute::AccessibilityContainer)),
    focused: raw.focused.filter(|_| keep(Attribute::Focused)),
    traits: raw.traits.filter(|_| keep(Attribute::Traits)),
    children: None,
    parent: parent.map(|(p, _)| p),
    depth,
    index: parent.map_or(0, |(_, i)| i),
  });

  if depth < max_depth {
    if let Some(raw_children) = &raw.children {
      let children = raw_children
        .iter()
        .enumerate()
        .map(|(i, child)| push_subtree(nodes, child, attributes, max_depth, Some((id, i)), depth + 1))
        .collect();
      nodes[id.0].children = Some(children);
    }
  }
  id
}
