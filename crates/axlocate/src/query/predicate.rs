/*!
Attribute predicates: `label == 'Login' AND enabled == 'true' OR name BEGINSWITH 'Sign'`.

A flat disjunction of conjunctions (`AND` binds tighter than `OR`). Keys are
checked against the closed attribute table when parsing, so a typo fails before
anything is evaluated.
*/

use std::fmt;

use super::document::attribute_text;
use super::lexer::invalid;
use crate::a11y::{Attribute, AttributeSet, DocumentAttribute, ElementType};
use crate::snapshot::{SnapshotId, SnapshotNode, SnapshotTree};
use crate::types::LocateResult;

/// Comparison between an attribute value and a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
  /// `==`
  Equals,
  /// `!=`
  NotEquals,
  /// `BEGINSWITH`
  BeginsWith,
  /// `ENDSWITH`
  EndsWith,
  /// `CONTAINS`
  Contains,
}

impl MatchOp {
  fn apply(self, actual: &str, expected: &str) -> bool {
    match self {
      Self::Equals => actual == expected,
      Self::NotEquals => actual != expected,
      Self::BeginsWith => actual.starts_with(expected),
      Self::EndsWith => actual.ends_with(expected),
      Self::Contains => actual.contains(expected),
    }
  }

  const fn symbol(self) -> &'static str {
    match self {
      Self::Equals => "==",
      Self::NotEquals => "!=",
      Self::BeginsWith => "BEGINSWITH",
      Self::EndsWith => "ENDSWITH",
      Self::Contains => "CONTAINS",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Condition {
  attribute: Attribute,
  op: MatchOp,
  value: String,
}

impl Condition {
  fn matches(&self, node: &SnapshotNode) -> bool {
    let actual = match self.attribute {
      Attribute::Frame => node.frame().map(|frame| {
        let [x, y, width, height] = frame.normalized();
        format!("{{{{{x}, {y}}}, {{{width}, {height}}}}}")
      }),
      Attribute::Uid => node.identity().ok().map(|id| id.to_string()),
      plain => attribute_text(node, DocumentAttribute::Plain(plain)),
    };
    // Uncaptured attributes compare as empty.
    self.op.apply(actual.as_deref().unwrap_or_default(), &self.value)
  }
}

/// A parsed attribute predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributePredicate {
  /// Outer: OR, inner: AND.
  clauses: Vec<Vec<Condition>>,
}

impl AttributePredicate {
  /// Parse predicate text.
  ///
  /// # Example
  ///
  /// ```
  /// use axlocate::query::AttributePredicate;
  ///
  /// assert!(AttributePredicate::parse("wdLabel == 'Login' AND type == 'Button'").is_ok());
  /// assert!(AttributePredicate::parse("colour == 'red'").is_err());
  /// ```
  ///
  /// # Errors
  ///
  /// `UnknownAttributeName` for keys outside the attribute table, `InvalidQuery`
  /// for malformed text.
  pub fn parse(text: &str) -> LocateResult<Self> {
    let mut scanner = Scanner { text, pos: 0 };
    let mut clauses = vec![Vec::new()];

    loop {
      let condition = scanner.condition()?;
      if let Some(clause) = clauses.last_mut() {
        clause.push(condition);
      }

      scanner.skip_whitespace();
      if scanner.at_end() {
        break;
      }
      if scanner.eat_word(&["AND", "&&"]) {
        continue;
      }
      if scanner.eat_word(&["OR", "||"]) {
        clauses.push(Vec::new());
        continue;
      }
      return Err(invalid(text, scanner.pos, "expected AND, OR or end of predicate"));
    }

    Ok(Self { clauses })
  }

  /// Whether `node` satisfies the predicate.
  pub fn matches(&self, node: &SnapshotNode) -> bool {
    self
      .clauses
      .iter()
      .any(|clause| clause.iter().all(|c| c.matches(node)))
  }

  /// Matching nodes of `tree` in document order.
  pub fn find(&self, tree: &SnapshotTree) -> Vec<SnapshotId> {
    tree
      .iter()
      .filter(|(_, node)| self.matches(node))
      .map(|(id, _)| id)
      .collect()
  }

  /// Attributes a capture must include for this predicate to see real values.
  pub fn attributes(&self) -> AttributeSet {
    self.clauses.iter().flatten().map(|c| c.attribute).collect()
  }
}

impl fmt::Display for AttributePredicate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, clause) in self.clauses.iter().enumerate() {
      if i > 0 {
        f.write_str(" OR ")?;
      }
      for (j, c) in clause.iter().enumerate() {
        if j > 0 {
          f.write_str(" AND ")?;
        }
        write!(f, "{} {} '{}'", c.attribute, c.op.symbol(), c.value.replace('\'', "\\'"))?;
      }
    }
    Ok(())
  }
}

struct Scanner<'t> {
  text: &'t str,
  pos: usize,
}

impl<'t> Scanner<'t> {
  fn rest(&self) -> &'t str {
    self.text.get(self.pos..).unwrap_or_default()
  }

  fn at_end(&self) -> bool {
    self.rest().is_empty()
  }

  fn skip_whitespace(&mut self) {
    let rest = self.rest();
    let skipped = rest.len() - rest.trim_start().len();
    self.pos += skipped;
  }

  /// Consume one of `words` (case-insensitive) if it comes next.
  fn eat_word(&mut self, words: &[&str]) -> bool {
    let rest = self.rest();
    let found = words.iter().find(|w| {
      rest
        .get(..w.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(w))
        && rest
          .get(w.len()..)
          .is_some_and(|tail| !tail.starts_with(|c: char| c.is_alphanumeric()))
    });
    if let Some(word) = found {
      self.pos += word.len();
      true
    } else {
      false
    }
  }

  fn condition(&mut self) -> LocateResult<Condition> {
    self.skip_whitespace();
    let key_start = self.pos;
    let rest = self.rest();
    let key_len = rest
      .find(|c: char| !(c.is_alphanumeric() || c == '_'))
      .unwrap_or(rest.len());
    let key = rest.get(..key_len).unwrap_or_default();
    if key.is_empty() {
      return Err(invalid(self.text, key_start, "expected attribute name"));
    }
    let attribute = Attribute::from_name(key)?;
    self.pos += key_len;

    self.skip_whitespace();
    let op_start = self.pos;
    let op = if self.eat_word(&["=="]) || self.eat_word(&["="]) {
      MatchOp::Equals
    } else if self.eat_word(&["!="]) {
      MatchOp::NotEquals
    } else if self.eat_word(&["BEGINSWITH"]) {
      MatchOp::BeginsWith
    } else if self.eat_word(&["ENDSWITH"]) {
      MatchOp::EndsWith
    } else if self.eat_word(&["CONTAINS"]) {
      MatchOp::Contains
    } else {
      return Err(invalid(self.text, op_start, "expected comparison operator"));
    };

    self.skip_whitespace();
    let value = self.quoted()?;
    let value = match attribute {
      // Accept `Button` as well as `XCUIElementTypeButton`.
      Attribute::Type => ElementType::from_name(&value).map_or(value, |t| t.document_name()),
      _ => value,
    };
    Ok(Condition {
      attribute,
      op,
      value,
    })
  }

  /// A single- or double-quoted string; backslash escapes the next character.
  fn quoted(&mut self) -> LocateResult<String> {
    let start = self.pos;
    let mut chars = self.rest().char_indices();
    let quote = match chars.next() {
      Some((_, q @ ('\'' | '"'))) => q,
      _ => return Err(invalid(self.text, start, "expected quoted value")),
    };

    let mut value = String::new();
    let mut escaped = false;
    for (i, c) in chars {
      if escaped {
        value.push(c);
        escaped = false;
      } else if c == '\\' {
        escaped = true;
      } else if c == quote {
        self.pos = start + i + c.len_utf8();
        return Ok(value);
      } else {
        value.push(c);
      }
    }
    Err(invalid(self.text, start, "unterminated quoted value"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::platform::testing::{login_tree, ScriptedProvider, PID};
  use crate::snapshot::{capture, CaptureRequest};
  use crate::types::{LocateError, NativeRef};

  fn login_snapshot() -> SnapshotTree {
    let provider = ScriptedProvider::new(login_tree());
    capture(&provider, &NativeRef::new(PID, 1), &CaptureRequest::default()).unwrap()
  }

  fn find(text: &str) -> Vec<u64> {
    let tree = login_snapshot();
    AttributePredicate::parse(text)
      .unwrap()
      .find(&tree)
      .into_iter()
      .map(|id| tree.node(id).unwrap().native().element)
      .collect()
  }

  #[test]
  fn equality_on_semantic_and_short_names() {
    assert_eq!(find("wdLabel == 'Login'"), vec![3]);
    assert_eq!(find("label = \"Login\""), vec![3]);
  }

  #[test]
  fn string_operators() {
    assert_eq!(find("label BEGINSWITH 'Ca'"), vec![4]);
    assert_eq!(find("label endswith 'in'"), vec![2, 3]);
    assert_eq!(find("name CONTAINS 'a'"), vec![2, 4]);
    assert_eq!(find("type != 'Button'"), vec![1, 2]);
  }

  #[test]
  fn and_binds_tighter_than_or() {
    assert_eq!(find("type == 'Window' OR type == 'Button' AND label == 'Cancel'"), vec![2, 4]);
    assert_eq!(find("type == 'XCUIElementTypeButton' && enabled == 'true'"), vec![3, 4]);
  }

  #[test]
  fn rect_and_index() {
    assert_eq!(find("wdRect == '{{30, 30}, {100, 40}}'"), vec![3]);
    assert_eq!(find("index == '1' AND type == 'Button'"), vec![4]);
  }

  #[test]
  fn accessibility_flags() {
    let provider = ScriptedProvider::new(login_tree());
    provider.update(3, |n| {
      n.focused = Some(true);
      n.accessible = Some(true);
    });
    provider.update(4, |n| {
      n.focused = Some(false);
      n.accessible = Some(true);
    });
    provider.update(2, |n| n.accessibility_container = Some(true));
    let tree = capture(&provider, &NativeRef::new(PID, 1), &CaptureRequest::default()).unwrap();
    let find = |text: &str| -> Vec<u64> {
      AttributePredicate::parse(text)
        .unwrap()
        .find(&tree)
        .into_iter()
        .map(|id| tree.node(id).unwrap().native().element)
        .collect()
    };

    assert_eq!(find("focused == 'true'"), vec![3]);
    assert_eq!(find("wdFocused == 'false'"), vec![4]);
    assert_eq!(find("wdAccessible == 'true' AND label == 'Cancel'"), vec![4]);
    assert_eq!(find("accessibilityContainer == 'true'"), vec![2]);
  }

  #[test]
  fn uid_matches_identity_string() {
    let uid = crate::identity::identity_of(&NativeRef::new(PID, 4)).unwrap();
    assert_eq!(find(&format!("UID == '{uid}'")), vec![4]);
  }

  #[test]
  fn escaped_quotes() {
    let predicate = AttributePredicate::parse(r"label == 'it\'s'").unwrap();
    assert_eq!(predicate.to_string(), r"wdLabel == 'it\'s'");
  }

  #[test]
  fn unknown_keys_fail_before_evaluation() {
    assert_eq!(
      AttributePredicate::parse("label == 'a' AND colour == 'red'"),
      Err(LocateError::UnknownAttributeName("colour".into()))
    );
  }

  #[test]
  fn malformed_predicates() {
    for (text, offset) in [
      ("label 'Login'", 6),
      ("label == Login", 9),
      ("label == 'Login", 9),
      ("label == 'a' XOR name == 'b'", 13),
      ("== 'a'", 0),
    ] {
      match AttributePredicate::parse(text) {
        Err(LocateError::InvalidQuery { offset: at, .. }) => assert_eq!(at, offset, "{text}"),
        other => panic!("{text}: expected InvalidQuery, got {other:?}"),
      }
    }
  }

  #[test]
  fn reports_needed_attributes() {
    let predicate = AttributePredicate::parse("label == 'a' OR wdRect == 'b'").unwrap();
    let attrs = predicate.attributes();
    assert!(attrs.contains(Attribute::Label));
    assert!(attrs.contains(Attribute::Frame));
    assert!(!attrs.contains(Attribute::Value));
  }
}
