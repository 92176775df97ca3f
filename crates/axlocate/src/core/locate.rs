/*!
Finding elements and rendering page source.

Provider calls happen before anything touches the cache; matched nodes are then
stored one by one.
*/

use std::sync::Arc;

use super::Session;
use crate::a11y::{Attribute, AttributeSet};
use crate::cache::ElementHandle;
use crate::query::{evaluate, serialize, AttributePredicate, CompiledQuery, XmlOptions};
use crate::snapshot::{capture, SnapshotRef, SnapshotTree};
use crate::types::{LocateError, LocateResult, NativeRef, NodeIdentity};

/// How to find elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Locator {
  /// Path expression over the serialized document.
  Query(CompiledQuery),
  /// Attribute predicate checked against each snapshot node.
  Predicate(AttributePredicate),
}

impl Locator {
  /// Compile a path query locator.
  pub fn query(text: &str) -> LocateResult<Self> {
    crate::query::compile(text).map(Self::Query)
  }

  /// Parse an attribute predicate locator.
  pub fn predicate(text: &str) -> LocateResult<Self> {
    AttributePredicate::parse(text).map(Self::Predicate)
  }

  /// Attributes a capture must include for this locator.
  ///
  /// Always includes the type plus the frame and text attributes, so that
  /// identity-less matches can be relocated later.
  pub fn attributes(&self) -> AttributeSet {
    let read = match self {
      Self::Query(query) => query.attributes(),
      Self::Predicate(predicate) => predicate.attributes(),
    };
    read.with(Attribute::Type).union(AttributeSet::relocation())
  }
}

impl From<CompiledQuery> for Locator {
  fn from(query: CompiledQuery) -> Self {
    Self::Query(query)
  }
}

impl From<AttributePredicate> for Locator {
  fn from(predicate: AttributePredicate) -> Self {
    Self::Predicate(predicate)
  }
}

impl Session {
  /// Find elements matching `locator` in document order.
  ///
  /// Searches below the cached element `scope`, or from the frontmost active
  /// application when `scope` is `None`. Matches with an identity are cached and
  /// returned as stable handles; the rest come back as ephemeral handles.
  /// No matches is an empty result.
  pub fn find_elements(&self, locator: &Locator, scope: Option<&NodeIdentity>) -> LocateResult<Vec<ElementHandle>> {
    let tree = Arc::new(self.capture_scope(scope, locator.attributes())?);

    let matched = match locator {
      Locator::Query(query) => {
        let (document, index) = serialize(&tree);
        evaluate(query, &document, &index)?
      }
      Locator::Predicate(predicate) => predicate.find(&tree),
    };
    log::debug!("locator matched {} of {} nodes", matched.len(), tree.len());

    Ok(
      matched
        .into_iter()
        .filter_map(|id| SnapshotRef::new(Arc::clone(&tree), id))
        .map(|snapshot| self.handle_for(snapshot))
        .collect(),
    )
  }

  /// First match of `locator`, if any.
  pub fn find_element(&self, locator: &Locator, scope: Option<&NodeIdentity>) -> LocateResult<Option<ElementHandle>> {
    Ok(self.find_elements(locator, scope)?.into_iter().next())
  }

  /// XML page source for `scope` (or the frontmost active application).
  ///
  /// Fails with `InvalidArgument` if `options.scope` is not a valid XML name.
  pub fn page_source(&self, scope: Option<&NodeIdentity>, options: &XmlOptions) -> LocateResult<String> {
    let tree = self.capture_scope(scope, AttributeSet::all())?;
    let (document, _) = serialize(&tree);
    document.to_xml(options)
  }

  /// Capture below a cached scope element or the frontmost active root.
  pub(super) fn capture_scope(
    &self,
    scope: Option<&NodeIdentity>,
    attributes: AttributeSet,
  ) -> LocateResult<SnapshotTree> {
    let request = self.config.capture_request(attributes);
    let Some(identity) = scope else {
      let root = self.active_root()?;
      return capture(self.provider(), &root, &request);
    };

    if !self.cache.has_identity(identity) {
      return Err(LocateError::InvalidReference(*identity));
    }
    let result = capture(self.provider(), &identity.native_ref(), &request);
    if matches!(result, Err(LocateError::StaleElement(_))) {
      self.cache.evict_stale(identity);
    }
    result
  }

  fn active_root(&self) -> LocateResult<NativeRef> {
    let roots = self
      .provider()
      .list_active_roots()
      .map_err(|e| e.for_target(&NativeRef::default()))?;
    roots
      .into_iter()
      .next()
      .map(|root| root.native)
      .ok_or_else(Self::no_active_root)
  }

  /// Cache `snapshot` if it has an identity, otherwise hand it out uncached.
  pub(super) fn handle_for(&self, snapshot: SnapshotRef) -> ElementHandle {
    match self.cache.store(&snapshot) {
      Some(identity) => ElementHandle::stable(identity, snapshot),
      None => {
        log::warn!(
          "matched node {} has no identity; returning an uncached handle",
          snapshot.node().native().element
        );
        ElementHandle::ephemeral(snapshot)
      }
    }
  }
}
