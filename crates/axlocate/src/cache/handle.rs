/*!
Element handles.

A handle pairs an optional identity with the latest snapshot of its node.
Handles with an identity are *stable*: they survive attribute changes and can be
cached. Handles without one come from path or attribute matches on nodes the
provider could not identify; they are *ephemeral* and only re-associated
heuristically (see [`crate::snapshot::fuzzy_match`]).

Resolution status only moves forward: `Unresolved -> Resolved -> Stale`.
A stale handle stays stale; a later successful lookup produces a new handle.
*/

use serde::Serialize;
use std::time::Duration;
use ts_rs::TS;

use crate::snapshot::{SnapshotNode, SnapshotRef};
use crate::types::{LocateError, LocateResult, NodeIdentity};

/// Whether a handle can be looked up by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum HandleKind {
  /// Keyed by identity; resistant to attribute changes.
  Stable,
  /// Matched by position or attributes; not cached.
  Ephemeral,
}

/// Lifecycle of an [`ElementHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum HandleState {
  /// Known by identity only; nothing captured yet.
  Unresolved,
  /// Backed by a snapshot.
  Resolved,
  /// The element is gone. Stale handles never come back.
  Stale,
}

/// A reference to a UI element as handed to callers.
#[derive(Debug, Clone)]
pub struct ElementHandle {
  identity: Option<NodeIdentity>,
  snapshot: Option<SnapshotRef>,
  state: HandleState,
}

impl ElementHandle {
  /// A handle for an identity that has not been looked up yet.
  pub const fn unresolved(identity: NodeIdentity) -> Self {
    Self {
      identity: Some(identity),
      snapshot: None,
      state: HandleState::Unresolved,
    }
  }

  pub(crate) fn stable(identity: NodeIdentity, snapshot: SnapshotRef) -> Self {
    Self {
      identity: Some(identity),
      snapshot: Some(snapshot),
      state: HandleState::Resolved,
    }
  }

  pub(crate) fn ephemeral(snapshot: SnapshotRef) -> Self {
    Self {
      identity: None,
      snapshot: Some(snapshot),
      state: HandleState::Resolved,
    }
  }

  /// `None` for ephemeral handles.
  pub fn identity(&self) -> Option<NodeIdentity> {
    self.identity
  }

  /// Stable when the handle has an identity.
  pub fn kind(&self) -> HandleKind {
    if self.identity.is_some() {
      HandleKind::Stable
    } else {
      HandleKind::Ephemeral
    }
  }

  /// Current lifecycle state.
  pub fn state(&self) -> HandleState {
    self.state
  }

  /// The snapshot the handle was last resolved from.
  pub fn snapshot(&self) -> Option<&SnapshotRef> {
    self.snapshot.as_ref()
  }

  /// The captured node, once resolved.
  pub fn node(&self) -> Option<&SnapshotNode> {
    self.snapshot.as_ref().map(SnapshotRef::node)
  }

  /// Time since the snapshot was captured.
  pub fn age(&self) -> Option<Duration> {
    self.snapshot.as_ref().map(|s| s.tree().age())
  }

  /// Replace the snapshot with a newer capture.
  pub(crate) fn refresh(&mut self, snapshot: SnapshotRef) -> LocateResult<()> {
    if self.state == HandleState::Stale {
      return Err(self.stale_error());
    }
    self.snapshot = Some(snapshot);
    self.state = HandleState::Resolved;
    Ok(())
  }

  /// Take over the snapshot and status of a freshly resolved handle.
  pub(crate) fn adopt(&mut self, resolved: Self) -> LocateResult<()> {
    match resolved.snapshot {
      Some(snapshot) if self.identity == resolved.identity => self.refresh(snapshot),
      _ => Err(LocateError::InvalidArgument(
        "resolved handle does not belong to this identity".into(),
      )),
    }
  }

  pub(crate) fn mark_stale(&mut self) {
    self.state = HandleState::Stale;
  }

  pub(crate) fn stale_error(&self) -> LocateError {
    match self.identity {
      Some(identity) => LocateError::StaleElement(identity),
      None => LocateError::InvalidArgument("ephemeral handle no longer matches any element".into()),
    }
  }
}
