/*!
Closed set of element attributes and their public names.

Every attribute has a semantic name (the `wd`-prefixed form clients use in
predicates), a short alias, and the attribute name(s) it carries in serialized
documents. External clients depend on the document names, so this table is the
single place they are defined:

| semantic     | short      | document                     |
|--------------|------------|------------------------------|
| `wdType`     | `type`     | `type`                       |
| `wdValue`    | `value`    | `value`                      |
| `wdName`     | `name`     | `name`                       |
| `wdLabel`    | `label`    | `label`                      |
| `wdEnabled`  | `enabled`  | `enabled`                    |
| `wdVisible`  | `visible`  | `visible`                    |
| `wdSelected` | `selected` | `selected`                   |
| `wdAccessible` | `accessible` | `accessible`             |
| `wdAccessibilityContainer` | `accessibilityContainer` | `accessibilityContainer` |
| `wdFocused`  | `focused`  | `focused`                    |
| `wdRect`     | `rect`     | `x`, `y`, `width`, `height`  |
| `wdIndex`    | `index`    | `index`                      |
| `wdTraits`   | `traits`   | `traits`                     |
| `wdUID`      | `UID`      | (not serialized)             |
*/

#![allow(missing_docs)]

use crate::types::{LocateError, LocateResult};
use std::fmt;

/// An attribute a snapshot can carry or a locator can test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
  Type,
  Value,
  Name,
  Label,
  Enabled,
  Visible,
  Selected,
  Accessible,
  AccessibilityContainer,
  Focused,
  Frame,
  Index,
  Traits,
  Uid,
}

/// Components of the frame as they appear in documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameComponent {
  X,
  Y,
  Width,
  Height,
}

/// What a document attribute name refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentAttribute {
  Plain(Attribute),
  Frame(FrameComponent),
}

impl Attribute {
  pub const ALL: [Attribute; 14] = [
    Self::Type,
    Self::Value,
    Self::Name,
    Self::Label,
    Self::Enabled,
    Self::Visible,
    Self::Selected,
    Self::Accessible,
    Self::AccessibilityContainer,
    Self::Focused,
    Self::Frame,
    Self::Index,
    Self::Traits,
    Self::Uid,
  ];

  /// The `wd`-prefixed name used by clients.
  pub const fn semantic_name(self) -> &'static str {
    match self {
      Self::Type => "wdType",
      Self::Value => "wdValue",
      Self::Name => "wdName",
      Self::Label => "wdLabel",
      Self::Enabled => "wdEnabled",
      Self::Visible => "wdVisible",
      Self::Selected => "wdSelected",
      Self::Accessible => "wdAccessible",
      Self::AccessibilityContainer => "wdAccessibilityContainer",
      Self::Focused => "wdFocused",
      Self::Frame => "wdRect",
      Self::Index => "wdIndex",
      Self::Traits => "wdTraits",
      Self::Uid => "wdUID",
    }
  }

  /// Shortcut accepted in place of the semantic name.
  pub const fn short_name(self) -> &'static str {
    match self {
      Self::Type => "type",
      Self::Value => "value",
      Self::Name => "name",
      Self::Label => "label",
      Self::Enabled => "enabled",
      Self::Visible => "visible",
      Self::Selected => "selected",
      Self::Accessible => "accessible",
      Self::AccessibilityContainer => "accessibilityContainer",
      Self::Focused => "focused",
      Self::Frame => "rect",
      Self::Index => "index",
      Self::Traits => "traits",
      Self::Uid => "UID",
    }
  }

  /// Resolve a client-supplied name (semantic or short form).
  ///
  /// # Example
  ///
  /// ```
  /// use axlocate::a11y::Attribute;
  ///
  /// assert_eq!(Attribute::from_name("wdLabel").unwrap(), Attribute::Label);
  /// assert_eq!(Attribute::from_name("label").unwrap(), Attribute::Label);
  /// assert!(Attribute::from_name("colour").is_err());
  /// ```
  pub fn from_name(name: &str) -> LocateResult<Self> {
    Self::ALL
      .into_iter()
      .find(|attr| attr.semantic_name() == name || attr.short_name() == name)
      .or(match name {
        "wdFrame" | "frame" => Some(Self::Frame),
        "uid" => Some(Self::Uid),
        _ => None,
      })
      .ok_or_else(|| LocateError::UnknownAttributeName(name.to_owned()))
  }

  /// Whether the accessibility provider has to fetch this attribute.
  /// Index and identity come from tree structure and native references.
  pub const fn is_provided(self) -> bool {
    !matches!(self, Self::Index | Self::Uid)
  }

  const fn bit(self) -> u16 {
    1 << (self as u16)
  }
}

impl fmt::Display for Attribute {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.semantic_name())
  }
}

impl DocumentAttribute {
  /// Resolve an attribute name as it appears in serialized documents.
  pub fn from_document_name(name: &str) -> LocateResult<Self> {
    Ok(match name {
      "type" => Self::Plain(Attribute::Type),
      "value" => Self::Plain(Attribute::Value),
      "name" => Self::Plain(Attribute::Name),
      "label" => Self::Plain(Attribute::Label),
      "enabled" => Self::Plain(Attribute::Enabled),
      "visible" => Self::Plain(Attribute::Visible),
      "selected" => Self::Plain(Attribute::Selected),
      "accessible" => Self::Plain(Attribute::Accessible),
      "accessibilityContainer" => Self::Plain(Attribute::AccessibilityContainer),
      "focused" => Self::Plain(Attribute::Focused),
      "index" => Self::Plain(Attribute::Index),
      "traits" => Self::Plain(Attribute::Traits),
      "x" => Self::Frame(FrameComponent::X),
      "y" => Self::Frame(FrameComponent::Y),
      "width" => Self::Frame(FrameComponent::Width),
      "height" => Self::Frame(FrameComponent::Height),
      _ => return Err(LocateError::UnknownAttributeName(name.to_owned())),
    })
  }

  /// Document attributes in serialization order.
  pub const ALL: [DocumentAttribute; 16] = [
    Self::Plain(Attribute::Type),
    Self::Plain(Attribute::Value),
    Self::Plain(Attribute::Name),
    Self::Plain(Attribute::Label),
    Self::Plain(Attribute::Enabled),
    Self::Plain(Attribute::Visible),
    Self::Plain(Attribute::Selected),
    Self::Plain(Attribute::Accessible),
    Self::Plain(Attribute::AccessibilityContainer),
    Self::Plain(Attribute::Focused),
    Self::Frame(FrameComponent::X),
    Self::Frame(FrameComponent::Y),
    Self::Frame(FrameComponent::Width),
    Self::Frame(FrameComponent::Height),
    Self::Plain(Attribute::Index),
    Self::Plain(Attribute::Traits),
  ];

  /// Name of the attribute in serialized documents.
  pub const fn document_name(self) -> &'static str {
    match self {
      Self::Frame(FrameComponent::X) => "x",
      Self::Frame(FrameComponent::Y) => "y",
      Self::Frame(FrameComponent::Width) => "width",
      Self::Frame(FrameComponent::Height) => "height",
      Self::Plain(attr) => attr.short_name(),
    }
  }

  /// The snapshot attribute that backs this document attribute.
  pub const fn source(self) -> Attribute {
    match self {
      Self::Plain(attr) => attr,
      Self::Frame(_) => Attribute::Frame,
    }
  }
}

/// Set of attributes, used to request captures and to exclude document attributes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttributeSet(u16);

impl AttributeSet {
  pub const fn empty() -> Self {
    Self(0)
  }

  pub const fn all() -> Self {
    let mut bits = 0;
    let mut i = 0;
    while i < Attribute::ALL.len() {
      bits |= Attribute::ALL[i].bit();
      i += 1;
    }
    Self(bits)
  }

  /// Attributes compared while waiting for an element to settle.
  pub const fn stability() -> Self {
    Self::empty()
      .with(Attribute::Frame)
      .with(Attribute::Enabled)
      .with(Attribute::Visible)
  }

  /// Attributes fuzzy re-association compares: frame and text.
  pub const fn relocation() -> Self {
    Self::empty()
      .with(Attribute::Frame)
      .with(Attribute::Label)
      .with(Attribute::Name)
      .with(Attribute::Value)
  }

  #[must_use]
  pub const fn with(self, attr: Attribute) -> Self {
    Self(self.0 | attr.bit())
  }

  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  pub const fn contains(self, attr: Attribute) -> bool {
    self.0 & attr.bit() != 0
  }

  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }

  pub fn iter(self) -> impl Iterator<Item = Attribute> {
    Attribute::ALL.into_iter().filter(move |a| self.contains(*a))
  }
}

impl FromIterator<Attribute> for AttributeSet {
  fn from_iter<I: IntoIterator<Item = Attribute>>(iter: I) -> Self {
    iter.into_iter().fold(Self::empty(), Self::with)
  }
}

impl fmt::Debug for AttributeSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.iter()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_attribute_resolves_by_both_names() {
    for attr in Attribute::ALL {
      assert_eq!(Attribute::from_name(attr.semantic_name()).unwrap(), attr);
      assert_eq!(Attribute::from_name(attr.short_name()).unwrap(), attr);
    }
  }

  #[test]
  fn unknown_names_are_rejected() {
    assert_eq!(
      Attribute::from_name("wdColour"),
      Err(LocateError::UnknownAttributeName("wdColour".into()))
    );
    assert!(DocumentAttribute::from_document_name("uid").is_err());
  }

  #[test]
  fn document_names_round_trip() {
    for attr in DocumentAttribute::ALL {
      assert_eq!(DocumentAttribute::from_document_name(attr.document_name()).unwrap(), attr);
    }
  }

  #[test]
  fn frame_components_map_to_frame() {
    for name in ["x", "y", "width", "height"] {
      let attr = DocumentAttribute::from_document_name(name).unwrap();
      assert_eq!(attr.source(), Attribute::Frame);
    }
  }

  #[test]
  fn set_operations() {
    let set = AttributeSet::empty()
      .with(Attribute::Label)
      .with(Attribute::Frame);
    assert!(set.contains(Attribute::Label));
    assert!(!set.contains(Attribute::Value));
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![Attribute::Label, Attribute::Frame]);

    let all = AttributeSet::all();
    assert!(Attribute::ALL.iter().all(|a| all.contains(*a)));
    assert!(AttributeSet::empty().is_empty());
  }

  #[test]
  fn stability_subset_is_small() {
    let set = AttributeSet::stability();
    assert_eq!(set.iter().count(), 3);
    assert!(set.contains(Attribute::Frame));
  }
}
