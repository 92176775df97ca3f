/*!
Flat, attribute-tagged view of a snapshot tree.

Queries run against this form, and page source is rendered from it. The document
carries no native back-pointers; the `NodeIndex` produced alongside it maps each
element back to the snapshot node it came from.
*/

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::a11y::{format_traits, Attribute, AttributeSet, DocumentAttribute, ElementType, FrameComponent};
use crate::snapshot::{SnapshotId, SnapshotNode, SnapshotTree};
use crate::types::{LocateError, LocateResult};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// One element of a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub struct DocElement {
  pub(crate) element_type: ElementType,
  /// Present attributes in serialization order.
  pub(crate) attributes: Vec<(DocumentAttribute, String)>,
  pub(crate) parent: Option<usize>,
  pub(crate) children: Vec<usize>,
}

impl DocElement {
  /// Element name, e.g. `XCUIElementTypeButton`.
  pub fn name(&self) -> String {
    self.element_type.document_name()
  }

  /// Type of the node this element was built from.
  pub fn element_type(&self) -> ElementType {
    self.element_type
  }

  /// Value of `attr`, if it was captured.
  pub fn attribute(&self, attr: DocumentAttribute) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|(a, _)| *a == attr)
      .map(|(_, v)| v.as_str())
  }

  /// Present attributes in serialization order.
  pub fn attributes(&self) -> impl Iterator<Item = (DocumentAttribute, &str)> {
    self.attributes.iter().map(|(a, v)| (*a, v.as_str()))
  }
}

/// Serialized tree. Elements are in document order; element 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  elements: Vec<DocElement>,
  generation: u64,
}

/// Maps document elements back to the snapshot nodes they were built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIndex {
  nodes: Vec<SnapshotId>,
  generation: u64,
}

impl NodeIndex {
  /// Snapshot node behind document element `element`.
  pub fn get(&self, element: usize) -> Option<SnapshotId> {
    self.nodes.get(element).copied()
  }

  pub(crate) fn generation(&self) -> u64 {
    self.generation
  }

  /// Number of mapped elements.
  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Whether nothing is mapped.
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }
}

/// Options for rendering page source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlOptions {
  /// Wrap the tree in an element with this name.
  pub scope: Option<String>,
  /// Attributes to leave out. Frame exclusion drops all four coordinates.
  pub excluded_attributes: AttributeSet,
}

/// Convert a snapshot tree into a document and its back-index.
///
/// Only attributes the tree was captured with are written; `index` (position
/// among siblings) is always present.
pub fn serialize(tree: &SnapshotTree) -> (Document, NodeIndex) {
  let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
  let mut elements = Vec::with_capacity(tree.len());
  let mut nodes = Vec::with_capacity(tree.len());

  for (id, node) in tree.iter() {
    elements.push(DocElement {
      element_type: node.element_type().unwrap_or_default(),
      attributes: DocumentAttribute::ALL
        .into_iter()
        .filter_map(|attr| attribute_text(node, attr).map(|text| (attr, text)))
        .collect(),
      parent: node.parent().map(SnapshotId::index),
      children: node
        .children()
        .unwrap_or_default()
        .iter()
        .map(|c| c.index())
        .collect(),
    });
    nodes.push(id);
  }

  (
    Document {
      elements,
      generation,
    },
    NodeIndex { nodes, generation },
  )
}

/// Text of a document attribute for `node`, or `None` if it was not captured.
pub(crate) fn attribute_text(node: &SnapshotNode, attr: DocumentAttribute) -> Option<String> {
  let frame_component = |c: FrameComponent| {
    node.frame().map(|frame| {
      let [x, y, width, height] = frame.normalized();
      match c {
        FrameComponent::X => x,
        FrameComponent::Y => y,
        FrameComponent::Width => width,
        FrameComponent::Height => height,
      }
      .to_string()
    })
  };

  match attr {
    DocumentAttribute::Frame(c) => frame_component(c),
    DocumentAttribute::Plain(plain) => match plain {
      Attribute::Type => node.element_type().map(|t| t.document_name()),
      Attribute::Value => node.value().map(str::to_owned),
      Attribute::Name => node.name().map(str::to_owned),
      Attribute::Label => node.label().map(str::to_owned),
      Attribute::Enabled => node.is_enabled().map(|b| b.to_string()),
      Attribute::Visible => node.is_visible().map(|b| b.to_string()),
      Attribute::Selected => node.is_selected().map(|b| b.to_string()),
      Attribute::Accessible => node.is_accessible().map(|b| b.to_string()),
      Attribute::AccessibilityContainer => node.is_accessibility_container().map(|b| b.to_string()),
      Attribute::Focused => node.is_focused().map(|b| b.to_string()),
      Attribute::Traits => node.traits().map(format_traits),
      Attribute::Index => Some(node.index().to_string()),
      Attribute::Frame | Attribute::Uid => None,
    },
  }
}

impl Document {
  /// The root element, if any.
  pub fn root(&self) -> Option<&DocElement> {
    self.elements.first()
  }

  /// Element at document position `index`.
  pub fn element(&self, index: usize) -> Option<&DocElement> {
    self.elements.get(index)
  }

  /// All elements in document order.
  pub fn elements(&self) -> &[DocElement] {
    &self.elements
  }

  /// Number of elements.
  pub fn len(&self) -> usize {
    self.elements.len()
  }

  /// Whether the document has no elements.
  pub fn is_empty(&self) -> bool {
    self.elements.is_empty()
  }

  pub(crate) fn generation(&self) -> u64 {
    self.generation
  }

  /// Render as an XML string.
  ///
  /// # Errors
  ///
  /// `InvalidArgument` if the scope is not a valid XML element name.
  ///
  /// # Example
  ///
  /// ```ignore
  /// let (document, _) = axlocate::query::serialize(&tree);
  /// let xml = document.to_xml(&XmlOptions::default())?;
  /// assert!(xml.starts_with("<?xml"));
  /// ```
  pub fn to_xml(&self, options: &XmlOptions) -> LocateResult<String> {
    if let Some(scope) = options.scope.as_deref().filter(|scope| !is_xml_name(scope)) {
      return Err(LocateError::InvalidArgument(format!(
        "'{scope}' is not a valid XML element name"
      )));
    }

    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let base_depth = usize::from(options.scope.is_some());

    if let Some(scope) = &options.scope {
      let _ = writeln!(out, "<{scope}>");
    }
    if !self.elements.is_empty() {
      self.write_element(&mut out, 0, base_depth, options.excluded_attributes);
    }
    if let Some(scope) = &options.scope {
      let _ = writeln!(out, "</{scope}>");
    }
    Ok(out)
  }

  fn write_element(&self, out: &mut String, index: usize, depth: usize, excluded: AttributeSet) {
    let Some(element) = self.elements.get(index) else {
      return;
    };
    let indent = "  ".repeat(depth);
    let name = element.name();

    let _ = write!(out, "{indent}<{name}");
    for (attr, value) in element.attributes() {
      if !excluded.contains(attr.source()) {
        let _ = write!(out, " {}=\"{}\"", attr.document_name(), escape(value));
      }
    }

    if element.children.is_empty() {
      out.push_str("/>\n");
      return;
    }
    out.push_str(">\n");
    for &child in &element.children {
      self.write_element(out, child, depth + 1, excluded);
    }
    let _ = writeln!(out, "{indent}</{name}>");
  }
}

/// Letter or `_` first, then letters, digits, `-`, `.` and `_`. No namespaces.
fn is_xml_name(name: &str) -> bool {
  let mut chars = name.chars();
  chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
    && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '.' | '_'))
}

/// Escape markup characters and drop characters XML 1.0 cannot carry.
fn escape(value: &str) -> String {
  let mut escaped = String::with_capacity(value.len());
  for c in value.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&apos;"),
      '\n' => escaped.push_str("&#10;"),
      '\t' | '\r' => escaped.push(c),
      c if c.is_control() => {}
      c => escaped.push(c),
    }
  }
  escaped
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::a11y::ElementType;
  use crate::platform::testing::{login_tree, node, with_children, ScriptedProvider, PID};
  use crate::snapshot::{capture, CaptureRequest};
  use crate::types::NativeRef;

  fn login_document() -> (Document, NodeIndex) {
    let provider = ScriptedProvider::new(login_tree());
    let tree = capture(&provider, &NativeRef::new(PID, 1), &CaptureRequest::default()).unwrap();
    serialize(&tree)
  }

  #[test]
  fn one_element_per_node_with_mapped_attributes() {
    let (doc, index) = login_document();
    assert_eq!(doc.len(), 4);
    assert_eq!(index.len(), 4);

    let login = doc.element(2).unwrap();
    assert_eq!(login.name(), "XCUIElementTypeButton");
    let get = |name| login.attribute(DocumentAttribute::from_document_name(name).unwrap());
    assert_eq!(get("type"), Some("XCUIElementTypeButton"));
    assert_eq!(get("label"), Some("Login"));
    assert_eq!(get("enabled"), Some("true"));
    assert_eq!(get("x"), Some("30"));
    assert_eq!(get("width"), Some("100"));
    assert_eq!(get("index"), Some("0"));
    assert_eq!(get("value"), None);

    let cancel = doc.element(3).unwrap();
    assert_eq!(cancel.attribute(DocumentAttribute::Plain(Attribute::Index)), Some("1"));
  }

  #[test]
  fn index_maps_back_to_snapshot_nodes() {
    let (doc, index) = login_document();
    for i in 0..doc.len() {
      assert_eq!(index.get(i).map(SnapshotId::index), Some(i));
    }
    assert_eq!(index.generation(), doc.generation());
  }

  #[test]
  fn each_serialization_has_its_own_generation() {
    let (a, _) = login_document();
    let (_, b) = login_document();
    assert_ne!(a.generation(), b.generation());
  }

  #[test]
  fn xml_page_source() {
    let (doc, _) = login_document();
    let options = XmlOptions {
      scope: Some("AppiumAUT".into()),
      excluded_attributes: AttributeSet::empty()
        .with(Attribute::Frame)
        .with(Attribute::Traits)
        .with(Attribute::Visible)
        .with(Attribute::Enabled)
        .with(Attribute::Selected)
        .with(Attribute::Name),
    };
    let xml = doc.to_xml(&options).unwrap();
    let expected = concat!(
      "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
      "<AppiumAUT>\n",
      "  <XCUIElementTypeApplication type=\"XCUIElementTypeApplication\" label=\"App\" index=\"0\">\n",
      "    <XCUIElementTypeWindow type=\"XCUIElementTypeWindow\" label=\"Main\" index=\"0\">\n",
      "      <XCUIElementTypeButton type=\"XCUIElementTypeButton\" label=\"Login\" index=\"0\"/>\n",
      "      <XCUIElementTypeButton type=\"XCUIElementTypeButton\" label=\"Cancel\" index=\"1\"/>\n",
      "    </XCUIElementTypeWindow>\n",
      "  </XCUIElementTypeApplication>\n",
      "</AppiumAUT>\n",
    );
    assert_eq!(xml, expected);
  }

  #[test]
  fn xml_escapes_values() {
    let mut raw = node(1, ElementType::StaticText, "a < b & \"c\"");
    raw.value = Some("line\nbreak\u{7}".into());
    let provider = ScriptedProvider::new(with_children(raw, vec![]));
    let tree = capture(&provider, &NativeRef::new(PID, 1), &CaptureRequest::default()).unwrap();
    let xml = serialize(&tree).0.to_xml(&XmlOptions::default()).unwrap();
    assert!(xml.contains("label=\"a &lt; b &amp; &quot;c&quot;\""));
    assert!(xml.contains("value=\"line&#10;break\""));
  }

  #[test]
  fn scope_must_be_an_xml_name() {
    let (doc, _) = login_document();
    for bad in ["", "1st", "a b", "x><script", "App\"Root"] {
      let options = XmlOptions {
        scope: Some(bad.into()),
        ..XmlOptions::default()
      };
      assert!(
        matches!(doc.to_xml(&options), Err(LocateError::InvalidArgument(_))),
        "{bad:?} should be rejected"
      );
    }
    let options = XmlOptions {
      scope: Some("_App-Root.v2".into()),
      ..XmlOptions::default()
    };
    assert!(doc.to_xml(&options).unwrap().contains("<_App-Root.v2>"));
  }

  #[test]
  fn traits_are_named() {
    let mut raw = node(1, ElementType::Button, "ok");
    raw.traits = Some(0b1001);
    let provider = ScriptedProvider::new(raw);
    let tree = capture(&provider, &NativeRef::new(PID, 1), &CaptureRequest::default()).unwrap();
    let (doc, _) = serialize(&tree);
    assert_eq!(
      doc.root().unwrap().attribute(DocumentAttribute::Plain(Attribute::Traits)),
      Some("Button, Selected")
    );
  }
}
