/*! Events emitted when the element cache changes. */

use super::NodeIdentity;
use serde::Serialize;
use ts_rs::TS;

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum EvictionReason {
  /// Pushed out by a newer entry at capacity.
  Capacity,
  /// The node vanished from the live tree.
  Stale,
}

/// Events emitted when cache state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "event", content = "data")]
#[ts(export)]
pub enum CacheEvent {
  #[serde(rename = "element:stored")]
  Stored {
    #[ts(type = "string")]
    identity: NodeIdentity,
  },
  #[serde(rename = "element:evicted")]
  Evicted {
    #[ts(type = "string")]
    identity: NodeIdentity,
    reason: EvictionReason,
  },
  #[serde(rename = "cache:reset")]
  Reset { dropped: usize },
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::ProcessId;

  #[test]
  fn events_serialize_with_tag_and_content() {
    let identity = NodeIdentity::new(ProcessId(1), 2);
    let json = serde_json::to_value(CacheEvent::Evicted {
      identity,
      reason: EvictionReason::Stale,
    })
    .unwrap();
    assert_eq!(json["event"], "element:evicted");
    assert_eq!(json["data"]["identity"], identity.to_string());
    assert_eq!(json["data"]["reason"], "stale");
  }

  #[test]
  fn reset_carries_count() {
    let json = serde_json::to_value(CacheEvent::Reset { dropped: 3 }).unwrap();
    assert_eq!(json["event"], "cache:reset");
    assert_eq!(json["data"]["dropped"], 3);
  }
}
