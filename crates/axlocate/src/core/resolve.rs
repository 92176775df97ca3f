/*!
Resolving, refreshing and re-associating element handles.

Identity-less handles are never cached. They are re-associated on demand by
fuzzy matching a fresh capture of the tree they came from.
*/

use std::sync::Arc;
use std::time::Duration;

use super::Session;
use crate::a11y::AttributeSet;
use crate::cache::{ElementHandle, HandleState};
use crate::snapshot::{self, capture, fuzzy_match, CaptureRequest, SnapshotRef};
use crate::types::{LocateError, LocateResult, NodeIdentity, Recency};

impl Session {
  /// Get a cached element, re-capturing it if `recency` demands it.
  ///
  /// # Example
  ///
  /// ```ignore
  /// let handle = session.resolve(&identity, Recency::Any)?;        // never calls the provider
  /// let handle = session.resolve(&identity, Recency::Current)?;    // always re-captures
  /// let handle = session.resolve(&identity, Recency::max_age_ms(100))?;
  /// ```
  pub fn resolve(&self, identity: &NodeIdentity, recency: Recency) -> LocateResult<ElementHandle> {
    let request = self.config.capture_request(AttributeSet::all());
    self.cache.resolve(self.provider(), identity, recency, &request)
  }

  /// [`Session::resolve`] for an identity string received from a client.
  pub fn resolve_str(&self, identity: &str, recency: Recency) -> LocateResult<ElementHandle> {
    self.resolve(&identity.parse()?, recency)
  }

  /// Bring `handle` up to date in place.
  ///
  /// Stable handles go through the cache. Ephemeral handles are re-associated
  /// with [`Session::relocate`]. A handle whose element is gone is marked stale
  /// and stays stale.
  pub fn refresh(&self, handle: &mut ElementHandle, recency: Recency) -> LocateResult<()> {
    if handle.state() == HandleState::Stale {
      return Err(handle.stale_error());
    }

    let Some(identity) = handle.identity() else {
      if handle.age().is_some_and(|age| recency.is_satisfied_by(age)) {
        return Ok(());
      }
      return match self.relocate(handle)? {
        Some(found) => {
          *handle = found;
          Ok(())
        }
        None => {
          handle.mark_stale();
          Err(handle.stale_error())
        }
      };
    };

    match self.resolve(&identity, recency) {
      Ok(resolved) => handle.adopt(resolved),
      Err(err @ LocateError::StaleElement(_)) => {
        handle.mark_stale();
        Err(err)
      }
      Err(err) => Err(err),
    }
  }

  /// Find the element `handle` referred to in a fresh capture.
  ///
  /// Re-captures the root of the tree the handle was captured in (same depth,
  /// its attributes plus frame and text) and picks the first node with the same type and position whose
  /// frame or text still matches. Returns `Ok(None)` when nothing qualifies.
  pub fn relocate(&self, handle: &ElementHandle) -> LocateResult<Option<ElementHandle>> {
    let Some(old) = handle.snapshot() else {
      return Err(LocateError::InvalidArgument("handle has never been resolved".into()));
    };

    let tree = old.tree();
    let attributes = tree.attributes().union(AttributeSet::relocation());
    let request = CaptureRequest::new(attributes, tree.max_depth(), self.config.ax_timeout());
    let fresh = Arc::new(capture(self.provider(), &tree.root().native(), &request)?);

    let found = fuzzy_match(old, &fresh, self.config.frame_epsilon)
      .and_then(|id| SnapshotRef::new(Arc::clone(&fresh), id));
    match &found {
      Some(snapshot) => log::debug!("relocated node {}", snapshot.node().native().element),
      None => log::debug!("node {} could not be relocated", old.node().native().element),
    }
    Ok(found.map(|snapshot| self.handle_for(snapshot)))
  }

  /// Wait until a cached element stops moving.
  ///
  /// Returns `Ok(false)` if it is still changing after `timeout` (default: the
  /// configured stability timeout).
  pub fn wait_until_stable(&self, identity: &NodeIdentity, timeout: Option<Duration>) -> LocateResult<bool> {
    if !self.cache.has_identity(identity) {
      return Err(LocateError::InvalidReference(*identity));
    }

    let timeout = timeout.unwrap_or_else(|| self.config.stability_timeout());
    let result = snapshot::wait_until_stable(
      self.provider(),
      &identity.native_ref(),
      timeout,
      &self.config.stability_config(),
    );
    if matches!(result, Err(LocateError::StaleElement(_))) {
      self.cache.evict_stale(identity);
    }
    result
  }
}
