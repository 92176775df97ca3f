/*! Error types for locator operations. */

use super::NodeIdentity;

/// Errors that can occur while identifying, caching or querying elements.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
  /// The node does not expose enough information to derive an identity.
  /// Soft failure: the node is still usable, it just cannot be cached.
  #[error("Element identity unavailable: {0}")]
  IdentityUnavailable(String),

  #[error("No cached element with identity {0}")]
  InvalidReference(NodeIdentity),

  #[error("Element {0} is no longer present in the accessibility tree")]
  StaleElement(NodeIdentity),

  #[error("Invalid query '{query}' at offset {offset}: {reason}")]
  InvalidQuery {
    query: String,
    offset: usize,
    reason: String,
  },

  #[error("Unknown attribute name '{0}'")]
  UnknownAttributeName(String),

  #[error("Query evaluation failed: {0}")]
  QueryEvaluationError(String),

  #[error("Accessibility provider timed out after {timeout_ms}ms")]
  AccessibilityTimeout { timeout_ms: u64 },

  #[error("Accessibility provider error: {0}")]
  Provider(String),

  #[error("Invalid argument: {0}")]
  InvalidArgument(String),
}

impl LocateError {
  /// Whether the caller may retry the same operation as-is.
  pub const fn is_retryable(&self) -> bool {
    matches!(self, Self::AccessibilityTimeout { .. })
  }
}

/// Result type for locator operations.
pub type LocateResult<T> = Result<T, LocateError>;
