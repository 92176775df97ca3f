/*!
Locating elements by path expression or attribute predicate.

A snapshot is serialized into a [`Document`] whose element names are the
`XCUIElementType…` names and whose attributes come from the closed attribute
table. Path queries (an XPath 1.0 subset) are compiled once and evaluated
against that document; matches map back to snapshot nodes through the
[`NodeIndex`] produced by the same serialization.

```
use axlocate::query::compile;

let query = compile("//XCUIElementTypeButton[@label='Login']").unwrap();
assert_eq!(query.as_str(), "//XCUIElementTypeButton[@label='Login']");
assert!(compile("//Button[").is_err());
```
*/

mod document;
mod eval;
mod lexer;
mod parser;
mod predicate;

use std::fmt;
use std::str::FromStr;

use crate::a11y::{Attribute, AttributeSet};
use crate::types::{LocateError, LocateResult};

pub use document::{serialize, DocElement, Document, NodeIndex, XmlOptions};
pub use eval::evaluate;
pub use predicate::{AttributePredicate, MatchOp};

/// A parsed, validated path query.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
  text: String,
  expr: parser::Expr,
  attributes: AttributeSet,
}

/// Parse and validate a path query.
///
/// Attribute names are checked against the closed table here, so a misspelled
/// `@lable` fails at compile time rather than silently matching nothing.
///
/// # Errors
///
/// `InvalidQuery` (with the offending offset) for malformed text or an
/// expression that does not select nodes, `UnknownAttributeName` for
/// attributes outside the table.
pub fn compile(text: &str) -> LocateResult<CompiledQuery> {
  let expr = parser::parse(text)?;
  if !expr.selects_nodes() {
    return Err(LocateError::InvalidQuery {
      query: text.to_owned(),
      offset: 0,
      reason: "expression does not select nodes".into(),
    });
  }

  let mut attributes = AttributeSet::empty().with(Attribute::Type);
  expr.visit_attributes(&mut |attr| {
    attributes = match attr {
      Some(attr) => attributes.with(attr.source()),
      None => AttributeSet::all(),
    };
  });

  log::debug!("compiled query '{text}' reading {attributes:?}");
  Ok(CompiledQuery {
    text: text.to_owned(),
    expr,
    attributes,
  })
}

impl CompiledQuery {
  /// The query text as given.
  pub fn as_str(&self) -> &str {
    &self.text
  }

  pub(crate) const fn expr(&self) -> &parser::Expr {
    &self.expr
  }

  /// Attributes a capture must include for this query to see real values.
  pub const fn attributes(&self) -> AttributeSet {
    self.attributes
  }
}

impl fmt::Display for CompiledQuery {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.text)
  }
}

impl FromStr for CompiledQuery {
  type Err = LocateError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    compile(s)
  }
}
