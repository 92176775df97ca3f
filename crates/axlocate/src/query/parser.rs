/*!
Recursive-descent parser for the supported path expression subset.

```text
Expr       := OrExpr
OrExpr     := AndExpr ('or' AndExpr)*
AndExpr    := EqExpr ('and' EqExpr)*
EqExpr     := RelExpr (('=' | '!=') RelExpr)*
RelExpr    := UnionExpr (('<' | '<=' | '>' | '>=') UnionExpr)*
UnionExpr  := PathExpr ('|' PathExpr)*
PathExpr   := LocationPath | Literal | Number | FunctionCall | '(' Expr ')'
```

Everything that can be checked statically is checked here: attribute names,
axis names, function names and arities. Evaluation never sees an unknown name.
*/

use super::lexer::{invalid, tokenize, Spanned, Token};
use crate::a11y::{DocumentAttribute, ElementType};
use crate::types::LocateResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
  Child,
  Descendant,
  DescendantOrSelf,
  SelfAxis,
  Parent,
  Ancestor,
  AncestorOrSelf,
  FollowingSibling,
  PrecedingSibling,
  Attribute,
}

impl Axis {
  fn from_name(name: &str) -> Option<Self> {
    Some(match name {
      "child" => Self::Child,
      "descendant" => Self::Descendant,
      "descendant-or-self" => Self::DescendantOrSelf,
      "self" => Self::SelfAxis,
      "parent" => Self::Parent,
      "ancestor" => Self::Ancestor,
      "ancestor-or-self" => Self::AncestorOrSelf,
      "following-sibling" => Self::FollowingSibling,
      "preceding-sibling" => Self::PrecedingSibling,
      "attribute" => Self::Attribute,
      _ => return None,
    })
  }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeTest {
  /// `node()`: any node on the axis.
  AnyNode,
  /// `*`: any element (or any attribute on the attribute axis).
  AnyName,
  /// An element type name. `None` for names outside the type table, which match nothing.
  Element(Option<ElementType>),
  Attribute(DocumentAttribute),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
  pub(crate) axis: Axis,
  pub(crate) test: NodeTest,
  pub(crate) predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LocationPath {
  pub(crate) absolute: bool,
  pub(crate) steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
  Eq,
  NotEq,
  Lt,
  LtEq,
  Gt,
  GtEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
  Position,
  Last,
  Not,
  Contains,
  StartsWith,
  Count,
  StringLength,
}

impl Function {
  fn from_name(name: &str) -> Option<Self> {
    Some(match name {
      "position" => Self::Position,
      "last" => Self::Last,
      "not" => Self::Not,
      "contains" => Self::Contains,
      "starts-with" => Self::StartsWith,
      "count" => Self::Count,
      "string-length" => Self::StringLength,
      _ => return None,
    })
  }

  fn accepts(self, arity: usize) -> bool {
    match self {
      Self::Position | Self::Last => arity == 0,
      Self::Not | Self::Count => arity == 1,
      Self::Contains | Self::StartsWith => arity == 2,
      Self::StringLength => arity <= 1,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
  Or(Box<Expr>, Box<Expr>),
  And(Box<Expr>, Box<Expr>),
  Compare(CompareOp, Box<Expr>, Box<Expr>),
  Union(Vec<Expr>),
  Path(LocationPath),
  Literal(String),
  Number(f64),
  Call(Function, Vec<Expr>),
}

impl Expr {
  /// Whether the expression always evaluates to a node-set.
  pub(crate) fn selects_nodes(&self) -> bool {
    match self {
      Self::Path(_) => true,
      Self::Union(parts) => parts.iter().all(Self::selects_nodes),
      _ => false,
    }
  }

  /// Visit every attribute the expression reads, including inside predicates.
  pub(crate) fn visit_attributes(&self, f: &mut impl FnMut(Option<DocumentAttribute>)) {
    match self {
      Self::Or(a, b) | Self::And(a, b) | Self::Compare(_, a, b) => {
        a.visit_attributes(f);
        b.visit_attributes(f);
      }
      Self::Union(parts) | Self::Call(_, parts) => {
        for part in parts {
          part.visit_attributes(f);
        }
      }
      Self::Path(path) => {
        for step in &path.steps {
          match (&step.axis, &step.test) {
            (_, NodeTest::Attribute(attr)) => f(Some(*attr)),
            (Axis::Attribute, NodeTest::AnyName | NodeTest::AnyNode) => f(None),
            _ => {}
          }
          for predicate in &step.predicates {
            predicate.visit_attributes(f);
          }
        }
      }
      Self::Literal(_) | Self::Number(_) => {}
    }
  }
}

pub(crate) fn parse(query: &str) -> LocateResult<Expr> {
  let tokens = tokenize(query)?;
  let mut parser = Parser {
    query,
    tokens,
    pos: 0,
  };
  if parser.tokens.is_empty() {
    return Err(invalid(query, 0, "empty query"));
  }
  let expr = parser.expr()?;
  if let Some(extra) = parser.tokens.get(parser.pos) {
    return Err(invalid(
      query,
      extra.offset,
      format!("unexpected {}", extra.token.describe()),
    ));
  }
  Ok(expr)
}

struct Parser<'q> {
  query: &'q str,
  tokens: Vec<Spanned>,
  pos: usize,
}

impl Parser<'_> {
  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos).map(|s| &s.token)
  }

  fn peek_at(&self, ahead: usize) -> Option<&Token> {
    self.tokens.get(self.pos + ahead).map(|s| &s.token)
  }

  fn offset(&self) -> usize {
    self
      .tokens
      .get(self.pos)
      .map_or(self.query.len(), |s| s.offset)
  }

  fn error(&self, reason: impl Into<String>) -> crate::types::LocateError {
    invalid(self.query, self.offset(), reason)
  }

  fn eat(&mut self, token: &Token) -> bool {
    if self.peek() == Some(token) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expect(&mut self, token: &Token, what: &str) -> LocateResult<()> {
    if self.eat(token) {
      Ok(())
    } else {
      Err(self.unexpected(what))
    }
  }

  fn unexpected(&self, expected: &str) -> crate::types::LocateError {
    match self.peek() {
      Some(found) => self.error(format!("expected {expected}, found {}", found.describe())),
      None => self.error(format!("expected {expected}, found end of query")),
    }
  }

  fn eat_keyword(&mut self, keyword: &str) -> bool {
    if matches!(self.peek(), Some(Token::Name(n)) if n == keyword) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expr(&mut self) -> LocateResult<Expr> {
    let mut lhs = self.and_expr()?;
    while self.eat_keyword("or") {
      lhs = Expr::Or(Box::new(lhs), Box::new(self.and_expr()?));
    }
    Ok(lhs)
  }

  fn and_expr(&mut self) -> LocateResult<Expr> {
    let mut lhs = self.eq_expr()?;
    while self.eat_keyword("and") {
      lhs = Expr::And(Box::new(lhs), Box::new(self.eq_expr()?));
    }
    Ok(lhs)
  }

  fn eq_expr(&mut self) -> LocateResult<Expr> {
    let mut lhs = self.rel_expr()?;
    loop {
      let op = match self.peek() {
        Some(Token::Eq) => CompareOp::Eq,
        Some(Token::NotEq) => CompareOp::NotEq,
        _ => return Ok(lhs),
      };
      self.pos += 1;
      lhs = Expr::Compare(op, Box::new(lhs), Box::new(self.rel_expr()?));
    }
  }

  fn rel_expr(&mut self) -> LocateResult<Expr> {
    let mut lhs = self.union_expr()?;
    loop {
      let op = match self.peek() {
        Some(Token::Lt) => CompareOp::Lt,
        Some(Token::LtEq) => CompareOp::LtEq,
        Some(Token::Gt) => CompareOp::Gt,
        Some(Token::GtEq) => CompareOp::GtEq,
        _ => return Ok(lhs),
      };
      self.pos += 1;
      lhs = Expr::Compare(op, Box::new(lhs), Box::new(self.union_expr()?));
    }
  }

  fn union_expr(&mut self) -> LocateResult<Expr> {
    let start = self.offset();
    let first = self.path_expr()?;
    if self.peek() != Some(&Token::Pipe) {
      return Ok(first);
    }
    let mut parts = vec![first];
    while self.eat(&Token::Pipe) {
      parts.push(self.path_expr()?);
    }
    if !parts.iter().all(Expr::selects_nodes) {
      return Err(invalid(self.query, start, "'|' only joins location paths"));
    }
    Ok(Expr::Union(parts))
  }

  fn path_expr(&mut self) -> LocateResult<Expr> {
    match self.peek() {
      Some(Token::Literal(s)) => {
        let s = s.clone();
        self.pos += 1;
        Ok(Expr::Literal(s))
      }
      Some(Token::Number(n)) => {
        let n = *n;
        self.pos += 1;
        Ok(Expr::Number(n))
      }
      Some(Token::LParen) => {
        self.pos += 1;
        let inner = self.expr()?;
        self.expect(&Token::RParen, "')'")?;
        Ok(inner)
      }
      Some(Token::Name(name))
        if self.peek_at(1) == Some(&Token::LParen) && name != "node" =>
      {
        self.function_call()
      }
      Some(_) => self.location_path().map(Expr::Path),
      None => Err(self.unexpected("expression")),
    }
  }

  fn function_call(&mut self) -> LocateResult<Expr> {
    let offset = self.offset();
    let Some(Token::Name(name)) = self.peek().cloned() else {
      return Err(self.unexpected("function name"));
    };
    let function = Function::from_name(&name)
      .ok_or_else(|| invalid(self.query, offset, format!("unknown function '{name}'")))?;
    self.pos += 2; // name and '('

    let mut args = Vec::new();
    if !self.eat(&Token::RParen) {
      loop {
        args.push(self.expr()?);
        if self.eat(&Token::RParen) {
          break;
        }
        self.expect(&Token::Comma, "',' or ')'")?;
      }
    }

    if !function.accepts(args.len()) {
      return Err(invalid(
        self.query,
        offset,
        format!("wrong number of arguments to '{name}': {}", args.len()),
      ));
    }
    if function == Function::Count && !args.iter().all(Expr::selects_nodes) {
      return Err(invalid(self.query, offset, "count() expects a location path"));
    }
    Ok(Expr::Call(function, args))
  }

  fn location_path(&mut self) -> LocateResult<LocationPath> {
    let mut steps = Vec::new();
    let absolute = match self.peek() {
      Some(Token::Slash) => {
        self.pos += 1;
        if !self.starts_step() {
          // Bare `/` selects the root.
          return Ok(LocationPath {
            absolute: true,
            steps,
          });
        }
        true
      }
      Some(Token::DoubleSlash) => {
        self.pos += 1;
        steps.push(descendant_or_self());
        true
      }
      _ => false,
    };

    steps.push(self.step()?);
    loop {
      if self.eat(&Token::Slash) {
        steps.push(self.step()?);
      } else if self.eat(&Token::DoubleSlash) {
        steps.push(descendant_or_self());
        steps.push(self.step()?);
      } else {
        break;
      }
    }
    Ok(LocationPath { absolute, steps })
  }

  fn starts_step(&self) -> bool {
    matches!(
      self.peek(),
      Some(Token::Name(_) | Token::Star | Token::At | Token::Dot | Token::DotDot)
    )
  }

  fn step(&mut self) -> LocateResult<Step> {
    if self.eat(&Token::Dot) {
      return Ok(Step {
        axis: Axis::SelfAxis,
        test: NodeTest::AnyNode,
        predicates: Vec::new(),
      });
    }
    if self.eat(&Token::DotDot) {
      return Ok(Step {
        axis: Axis::Parent,
        test: NodeTest::AnyNode,
        predicates: Vec::new(),
      });
    }

    let axis = if self.eat(&Token::At) {
      Axis::Attribute
    } else if let (Some(Token::Name(name)), Some(Token::DoubleColon)) =
      (self.peek(), self.peek_at(1))
    {
      let offset = self.offset();
      let axis = Axis::from_name(name)
        .ok_or_else(|| invalid(self.query, offset, format!("unknown axis '{name}'")))?;
      self.pos += 2;
      axis
    } else {
      Axis::Child
    };

    let test = self.node_test(axis)?;
    let mut predicates = Vec::new();
    while self.eat(&Token::LBracket) {
      predicates.push(self.expr()?);
      self.expect(&Token::RBracket, "']'")?;
    }
    Ok(Step {
      axis,
      test,
      predicates,
    })
  }

  fn node_test(&mut self, axis: Axis) -> LocateResult<NodeTest> {
    match self.peek().cloned() {
      Some(Token::Star) => {
        self.pos += 1;
        Ok(NodeTest::AnyName)
      }
      Some(Token::Name(name)) if self.peek_at(1) == Some(&Token::LParen) => {
        if name != "node" {
          return Err(self.error(format!("unsupported node test '{name}()'")));
        }
        self.pos += 2;
        self.expect(&Token::RParen, "')'")?;
        Ok(NodeTest::AnyNode)
      }
      Some(Token::Name(name)) => {
        self.pos += 1;
        if axis == Axis::Attribute {
          DocumentAttribute::from_document_name(&name).map(NodeTest::Attribute)
        } else {
          Ok(NodeTest::Element(ElementType::from_name(&name)))
        }
      }
      _ => Err(self.unexpected("node test")),
    }
  }
}

fn descendant_or_self() -> Step {
  Step {
    axis: Axis::DescendantOrSelf,
    test: NodeTest::AnyNode,
    predicates: Vec::new(),
  }
}
