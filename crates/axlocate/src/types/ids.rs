/*! Branded ID types for type-safe node references. */

use derive_more::{Display, From, Into};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use super::{LocateError, LocateResult};

/// Process ID - branded type to distinguish from other u32 values.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS, Display, From, Into,
)]
#[ts(export)]
pub struct ProcessId(pub u32);

/// Provider-level reference to a native accessibility element.
///
/// `pid` is `None` when the provider handed out a cross-process reference it has
/// not resolved yet. `element` is the provider's element id; providers must never
/// reuse an element id within one process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NativeRef {
  pub pid: Option<ProcessId>,
  pub element: u64,
}

impl NativeRef {
  pub const fn new(pid: u32, element: u64) -> Self {
    Self {
      pid: Some(ProcessId(pid)),
      element,
    }
  }

  /// A reference whose owning process is not known yet.
  pub const fn unresolved(element: u64) -> Self {
    Self { pid: None, element }
  }
}

/// Stable identity of a UI node.
///
/// Carries no attribute information: two identities are equal iff both the owning
/// process and the native element id match. Rendered as a UUID-shaped string,
/// which is also the form clients send back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdentity {
  pid: ProcessId,
  element: u64,
}

impl NodeIdentity {
  pub(crate) const fn new(pid: ProcessId, element: u64) -> Self {
    Self { pid, element }
  }

  pub const fn pid(&self) -> ProcessId {
    self.pid
  }

  pub const fn element(&self) -> u64 {
    self.element
  }

  /// The native reference this identity was derived from.
  pub const fn native_ref(&self) -> NativeRef {
    NativeRef {
      pid: Some(self.pid),
      element: self.element,
    }
  }
}

// Layout: 8 hex digits of the upper element half, 4+4 of the lower half,
// then 4+12 digits holding the process id (upper 4 digits always zero).
impl fmt::Display for NodeIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let hi = self.element >> 32;
    let lo = self.element & 0xFFFF_FFFF;
    write!(
      f,
      "{:08X}-{:04X}-{:04X}-0000-{:012X}",
      hi,
      lo >> 16,
      lo & 0xFFFF,
      self.pid.0
    )
  }
}

impl FromStr for NodeIdentity {
  type Err = LocateError;

  fn from_str(s: &str) -> LocateResult<Self> {
    let invalid = || LocateError::InvalidArgument(format!("'{s}' is not a valid element identity"));

    let parts: Vec<&str> = s.split('-').collect();
    let [hi, mid, lo, zero, pid] = parts.as_slice() else {
      return Err(invalid());
    };
    let widths_ok = hi.len() == 8 && mid.len() == 4 && lo.len() == 4 && zero.len() == 4 && pid.len() == 12;
    if !widths_ok || *zero != "0000" {
      return Err(invalid());
    }

    let parse = |part: &str| u64::from_str_radix(part, 16).map_err(|_| invalid());
    let element = (parse(hi)? << 32) | (parse(mid)? << 16) | parse(lo)?;
    let pid = u32::try_from(parse(pid)?).map_err(|_| invalid())?;

    Ok(Self::new(ProcessId(pid), element))
  }
}

impl Serialize for NodeIdentity {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for NodeIdentity {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn display_is_uuid_shaped() {
    let id = NodeIdentity::new(ProcessId(0x1F4), 0x0000_0001_0002_0003);
    assert_eq!(id.to_string(), "00000001-0002-0003-0000-0000000001F4");
  }

  #[test]
  fn parses_its_own_display() {
    let id = NodeIdentity::new(ProcessId(4242), 0xDEAD_BEEF_CAFE_F00D);
    let parsed: NodeIdentity = id.to_string().parse().unwrap();
    assert_eq!(parsed, id);
  }

  #[test]
  fn parsing_is_case_insensitive() {
    let parsed: NodeIdentity = "0000000a-000b-000c-0000-00000000000d".parse().unwrap();
    assert_eq!(parsed.pid(), ProcessId(13));
    assert_eq!(parsed.element(), 0x0000_000A_000B_000C);
  }

  #[test]
  fn rejects_malformed_strings() {
    for bad in [
      "",
      "not-a-uid",
      "00000001-0002-0003-0000",
      "00000001-0002-0003-0001-0000000001F4",
      "0000000G-0002-0003-0000-0000000001F4",
      "00000001-0002-0003-0000-1000000001F4",
    ] {
      assert!(
        matches!(bad.parse::<NodeIdentity>(), Err(LocateError::InvalidArgument(_))),
        "{bad:?} should be rejected"
      );
    }
  }

  #[test]
  fn equality_needs_both_components() {
    let a = NodeIdentity::new(ProcessId(1), 7);
    assert_eq!(a, NodeIdentity::new(ProcessId(1), 7));
    assert_ne!(a, NodeIdentity::new(ProcessId(2), 7));
    assert_ne!(a, NodeIdentity::new(ProcessId(1), 8));
  }

  #[test]
  fn orders_by_process_then_element() {
    let mut ids = vec![
      NodeIdentity::new(ProcessId(2), 1),
      NodeIdentity::new(ProcessId(1), 9),
      NodeIdentity::new(ProcessId(1), 3),
    ];
    ids.sort();
    assert_eq!(
      ids,
      vec![
        NodeIdentity::new(ProcessId(1), 3),
        NodeIdentity::new(ProcessId(1), 9),
        NodeIdentity::new(ProcessId(2), 1),
      ]
    );
    assert!(ProcessId(1) < ProcessId(2));
  }

  #[test]
  fn serde_uses_string_form() {
    let id = NodeIdentity::new(ProcessId(3), 9);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"00000000-0000-0009-0000-000000000003\"");
    let back: NodeIdentity = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
  }
}
