/*!
Accessibility provider abstraction.

This trait defines the contract between the core and whatever produces raw node
data from the OS accessibility layer. The core never assumes provider calls are
cheap: every call may block on cross-process IPC and every call may time out.
*/

use std::time::Duration;

use crate::a11y::{AttributeSet, ElementType};
use crate::types::{Frame, LocateError, NativeRef};

/// A raw node as reported by the provider.
///
/// Attributes the provider was not asked for are `None`. `children` is `None`
/// when the depth limit was reached (children omitted), and `Some(vec![])` when
/// the node has no children.
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct RawNode {
  /// Provider reference, also the source of the node's identity.
  pub native: NativeRef,
  pub element_type: Option<ElementType>,
  /// Frame in screen points.
  pub frame: Option<Frame>,
  pub label: Option<String>,
  pub name: Option<String>,
  pub value: Option<String>,
  pub enabled: Option<bool>,
  pub visible: Option<bool>,
  pub selected: Option<bool>,
  pub accessible: Option<bool>,
  /// Whether some descendant, at any depth, is accessible.
  pub accessibility_container: Option<bool>,
  pub focused: Option<bool>,
  /// Raw accessibility trait bitmask.
  pub traits: Option<u64>,
  pub children: Option<Vec<RawNode>>,
}

/// Failures reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
  /// The call did not finish within its budget.
  #[error("timed out after {0:?}")]
  Timeout(Duration),

  /// The target node no longer exists.
  #[error("node not found")]
  NotFound,

  /// Any other provider failure.
  #[error("{0}")]
  Failed(String),
}

impl ProviderError {
  /// Map to the public taxonomy for a call that targeted `target`.
  pub(crate) fn for_target(self, target: &NativeRef) -> LocateError {
    match self {
      Self::Timeout(timeout) => LocateError::AccessibilityTimeout {
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
      },
      Self::NotFound => match crate::identity::identity_of(target) {
        Ok(identity) => LocateError::StaleElement(identity),
        Err(_) => LocateError::Provider(format!("node {} not found", target.element)),
      },
      Self::Failed(reason) => LocateError::Provider(reason),
    }
  }
}

/// Source of raw accessibility data. Implementations must be safe to call from
/// several threads; the core serializes nothing on their behalf.
pub trait AccessibilityProvider: Send + Sync + 'static {
  /// Capture `target` and its descendants down to `max_depth` levels (0 = the
  /// node alone), fetching only `attributes`.
  fn capture_subtree(
    &self,
    target: &NativeRef,
    attributes: AttributeSet,
    max_depth: usize,
    timeout: Duration,
  ) -> Result<RawNode, ProviderError>;

  /// Root nodes of the currently active applications, frontmost first.
  /// Only the root nodes themselves are populated; children may be omitted.
  fn list_active_roots(&self) -> Result<Vec<RawNode>, ProviderError>;
}
