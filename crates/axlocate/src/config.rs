/*!
Session configuration.

All values have sensible defaults. Override individual fields:

```
use axlocate::SessionConfig;

let config = SessionConfig {
  element_cache_size: 256,
  ..Default::default()
};
assert_eq!(config.snapshot_max_depth, 50);
```

Routers forwarding client settings can merge a JSON object over an existing
config with [`SessionConfig::merge_json`].
*/

use std::time::Duration;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::a11y::AttributeSet;
use crate::cache::ELEMENT_CACHE_SIZE;
use crate::snapshot::{
  CaptureRequest, StabilityConfig, DEFAULT_AX_TIMEOUT_MS, DEFAULT_FRAME_EPSILON, DEFAULT_MAX_DEPTH,
  DEFAULT_POLL_INTERVAL_MS,
};
use crate::types::{LocateError, LocateResult};

const DEFAULT_STABILITY_TIMEOUT_MS: u64 = 10_000;

/// Session settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
#[ts(export)]
pub struct SessionConfig {
  /// Maximum number of cached element handles.
  /// Default: 1024.
  pub element_cache_size: usize,

  /// Levels below the capture target included in snapshots.
  /// Default: 50.
  pub snapshot_max_depth: usize,

  /// Per-component frame tolerance, in points, for stability and fuzzy matching.
  /// Default: 0.5.
  pub frame_epsilon: f64,

  /// Delay between reads while waiting for an element to settle.
  /// Default: 50ms.
  #[ts(type = "number")]
  pub stability_poll_interval_ms: u64,

  /// Default overall budget for `wait_until_stable`.
  /// Default: 10s.
  #[ts(type = "number")]
  pub stability_timeout_ms: u64,

  /// Budget for each individual provider call.
  /// Default: 10s.
  #[ts(type = "number")]
  pub ax_timeout_ms: u64,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      element_cache_size: ELEMENT_CACHE_SIZE,
      snapshot_max_depth: DEFAULT_MAX_DEPTH,
      frame_epsilon: DEFAULT_FRAME_EPSILON,
      stability_poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
      stability_timeout_ms: DEFAULT_STABILITY_TIMEOUT_MS,
      ax_timeout_ms: DEFAULT_AX_TIMEOUT_MS,
    }
  }
}

impl SessionConfig {
  /// Create a new config with default values.
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse a complete or partial config; missing fields take their defaults.
  pub fn from_json(json: &str) -> LocateResult<Self> {
    let config: Self =
      serde_json::from_str(json).map_err(|e| LocateError::InvalidArgument(format!("invalid settings: {e}")))?;
    config.validate()?;
    Ok(config)
  }

  /// Apply the fields present in `patch` (a JSON object) on top of `self`.
  pub fn merge_json(&self, patch: &serde_json::Value) -> LocateResult<Self> {
    let Some(patch) = patch.as_object() else {
      return Err(LocateError::InvalidArgument("settings must be a JSON object".into()));
    };
    let mut merged =
      serde_json::to_value(self).map_err(|e| LocateError::InvalidArgument(format!("invalid settings: {e}")))?;
    if let Some(base) = merged.as_object_mut() {
      for (key, value) in patch {
        base.insert(key.clone(), value.clone());
      }
    }

    let config: Self =
      serde_json::from_value(merged).map_err(|e| LocateError::InvalidArgument(format!("invalid settings: {e}")))?;
    config.validate()?;
    Ok(config)
  }

  /// Reject settings no session can run with.
  pub fn validate(&self) -> LocateResult<()> {
    if self.element_cache_size == 0 {
      return Err(LocateError::InvalidArgument("element cache size must be positive".into()));
    }
    if !self.frame_epsilon.is_finite() || self.frame_epsilon < 0.0 {
      return Err(LocateError::InvalidArgument(format!(
        "frame epsilon must be a non-negative number, got {}",
        self.frame_epsilon
      )));
    }
    if self.stability_poll_interval_ms == 0 {
      return Err(LocateError::InvalidArgument("stability poll interval must be positive".into()));
    }
    Ok(())
  }

  /// Budget for each provider call.
  pub const fn ax_timeout(&self) -> Duration {
    Duration::from_millis(self.ax_timeout_ms)
  }

  /// Default budget for waiting on an element to settle.
  pub const fn stability_timeout(&self) -> Duration {
    Duration::from_millis(self.stability_timeout_ms)
  }

  /// A capture of `attributes` with the configured depth and provider budget.
  pub const fn capture_request(&self, attributes: AttributeSet) -> CaptureRequest {
    CaptureRequest::new(attributes, self.snapshot_max_depth, self.ax_timeout())
  }

  /// Polling settings for stability waits.
  pub const fn stability_config(&self) -> StabilityConfig {
    StabilityConfig {
      poll_interval: Duration::from_millis(self.stability_poll_interval_ms),
      epsilon: self.frame_epsilon,
      ax_timeout: self.ax_timeout(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn defaults() {
    let config = SessionConfig::default();
    assert_eq!(config.element_cache_size, 1024);
    assert_eq!(config.snapshot_max_depth, 50);
    assert!((config.frame_epsilon - 0.5).abs() < f64::EPSILON);
    assert_eq!(config.stability_poll_interval_ms, 50);
    assert_eq!(config.stability_timeout(), Duration::from_secs(10));
    assert_eq!(config.ax_timeout(), Duration::from_secs(10));
    assert!(config.validate().is_ok());
  }

  #[test]
  fn serializes_camel_case() {
    let value = serde_json::to_value(SessionConfig::default()).unwrap();
    assert_eq!(value["elementCacheSize"], 1024);
    assert_eq!(value["axTimeoutMs"], 10_000);
  }

  #[test]
  fn partial_json_keeps_defaults() {
    let config = SessionConfig::from_json(r#"{"snapshotMaxDepth": 5}"#).unwrap();
    assert_eq!(config.snapshot_max_depth, 5);
    assert_eq!(config.element_cache_size, 1024);
  }

  #[test]
  fn merge_overrides_only_given_fields() {
    let base = SessionConfig {
      element_cache_size: 16,
      ..SessionConfig::default()
    };
    let merged = base.merge_json(&json!({ "frameEpsilon": 2.0 })).unwrap();
    assert_eq!(merged.element_cache_size, 16);
    assert!((merged.frame_epsilon - 2.0).abs() < f64::EPSILON);
  }

  #[test]
  fn rejects_unusable_settings() {
    assert!(matches!(
      SessionConfig::from_json(r#"{"elementCacheSize": 0}"#),
      Err(LocateError::InvalidArgument(_))
    ));
    assert!(matches!(
      SessionConfig::default().merge_json(&json!({ "frameEpsilon": -1.0 })),
      Err(LocateError::InvalidArgument(_))
    ));
    assert!(matches!(
      SessionConfig::default().merge_json(&json!({ "colour": "red" })),
      Err(LocateError::InvalidArgument(_))
    ));
    assert!(matches!(
      SessionConfig::default().merge_json(&json!([1, 2])),
      Err(LocateError::InvalidArgument(_))
    ));
  }

  #[test]
  fn derived_requests_use_configured_values() {
    let config = SessionConfig {
      snapshot_max_depth: 3,
      ax_timeout_ms: 250,
      stability_poll_interval_ms: 20,
      ..SessionConfig::default()
    };
    let request = config.capture_request(AttributeSet::stability());
    assert_eq!(request.max_depth, 3);
    assert_eq!(request.timeout, Duration::from_millis(250));
    assert_eq!(request.attributes, AttributeSet::stability());

    let stability = config.stability_config();
    assert_eq!(stability.poll_interval, Duration::from_millis(20));
    assert_eq!(stability.ax_timeout, Duration::from_millis(250));
  }
}
