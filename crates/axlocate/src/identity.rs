/*!
Element identity derivation.

An identity is built only from properties that survive attribute churn: the
owning process and the provider's native element id. Labels, frames and values
never feed into it, so a button whose title changes keeps its identity.
*/

use crate::platform::RawNode;
use crate::types::{LocateError, LocateResult, NativeRef, NodeIdentity};

/// Derive the identity of a native element.
///
/// Fails with `IdentityUnavailable` for references that have no owning process
/// yet (unresolved cross-process references) or carry the null element id.
/// Deterministic and free of side effects.
///
/// # Example
///
/// ```
/// use axlocate::{identity_of, NativeRef};
///
/// let a = identity_of(&NativeRef::new(42, 7)).unwrap();
/// let b = identity_of(&NativeRef::new(42, 7)).unwrap();
/// assert_eq!(a, b);
/// assert!(identity_of(&NativeRef::unresolved(7)).is_err());
/// ```
pub fn identity_of(native: &NativeRef) -> LocateResult<NodeIdentity> {
  let Some(pid) = native.pid else {
    return Err(LocateError::IdentityUnavailable(format!(
      "element {} has no owning process",
      native.element
    )));
  };
  if native.element == 0 {
    return Err(LocateError::IdentityUnavailable(format!(
      "process {pid} reported a null element reference"
    )));
  }
  Ok(NodeIdentity::new(pid, native.element))
}

impl RawNode {
  /// Identity of this node, see [`identity_of`].
  pub fn identity(&self) -> LocateResult<NodeIdentity> {
    identity_of(&self.native)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::ProcessId;

  #[test]
  fn same_node_same_identity() {
    let native = NativeRef::new(10, 99);
    assert_eq!(identity_of(&native).unwrap(), identity_of(&native).unwrap());
  }

  #[test]
  fn both_components_distinguish() {
    let base = identity_of(&NativeRef::new(10, 99)).unwrap();
    assert_ne!(base, identity_of(&NativeRef::new(11, 99)).unwrap());
    assert_ne!(base, identity_of(&NativeRef::new(10, 98)).unwrap());
    assert_eq!(base.pid(), ProcessId(10));
    assert_eq!(base.native_ref(), NativeRef::new(10, 99));
  }

  #[test]
  fn attributes_do_not_affect_identity() {
    let mut node = RawNode {
      native: NativeRef::new(1, 5),
      label: Some("Before".into()),
      ..RawNode::default()
    };
    let before = node.identity().unwrap();
    node.label = Some("After".into());
    node.frame = Some(crate::types::Frame::new(1.0, 2.0, 3.0, 4.0));
    assert_eq!(node.identity().unwrap(), before);
  }

  #[test]
  fn unresolved_references_have_no_identity() {
    assert!(matches!(
      identity_of(&NativeRef::unresolved(5)),
      Err(LocateError::IdentityUnavailable(_))
    ));
    assert!(matches!(
      identity_of(&NativeRef::new(1, 0)),
      Err(LocateError::IdentityUnavailable(_))
    ));
  }
}
