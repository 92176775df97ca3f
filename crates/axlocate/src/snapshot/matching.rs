/*!
Re-associating a previously captured node with a fresh capture.

Used for handles that have no identity (path or attribute matches), so there is
no key to look them up by. Heuristic by nature: a node that moved *and* changed
its text will not be found.
*/

use super::{SnapshotId, SnapshotNode, SnapshotRef, SnapshotTree};

/// Find the node in `candidates` that best corresponds to `old`.
///
/// A candidate must have the same type, depth and sibling index, and then either
/// a frame within `epsilon` or equal label, name and value. The first candidate
/// in document order that clears every check wins.
pub fn fuzzy_match(old: &SnapshotRef, candidates: &SnapshotTree, epsilon: f64) -> Option<SnapshotId> {
  let old = old.node();
  candidates
    .iter()
    .find(|(_, candidate)| {
      same_position(old, candidate)
        && (same_frame(old, candidate, epsilon) || same_text(old, candidate))
    })
    .map(|(id, _)| id)
}

fn same_position(old: &SnapshotNode, candidate: &SnapshotNode) -> bool {
  old.element_type == candidate.element_type && old.depth == candidate.depth && old.index == candidate.index
}

fn same_frame(old: &SnapshotNode, candidate: &SnapshotNode, epsilon: f64) -> bool {
  match (old.frame, candidate.frame) {
    (Some(a), Some(b)) => a.matches(&b, epsilon),
    _ => false,
  }
}

/// Needs at least one text attribute on the old node; all three must agree.
fn same_text(old: &SnapshotNode, candidate: &SnapshotNode) -> bool {
  let has_text = old.label.is_some() || old.name.is_some() || old.value.is_some();
  has_text && old.label == candidate.label && old.name == candidate.name && old.value == candidate.value
}
