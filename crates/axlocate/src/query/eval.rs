/*!
Evaluator for compiled path expressions.

Follows XPath 1.0 semantics for the supported subset: node-sets are kept in
document order without duplicates, predicates see proximity positions along
their axis, and comparisons involving node-sets are existential.
*/

use super::document::{Document, NodeIndex};
use super::parser::{Axis, CompareOp, Expr, Function, LocationPath, NodeTest, Step};
use super::CompiledQuery;
use crate::snapshot::SnapshotId;
use crate::types::{LocateError, LocateResult};

/// A node of the document, including the virtual root above the top element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Node {
  Root,
  Element(usize),
  /// Element index and position in that element's attribute list.
  Attribute(usize, usize),
}

impl Node {
  fn order_key(self) -> (usize, usize) {
    match self {
      Self::Root => (0, 0),
      Self::Element(i) => (i + 1, 0),
      Self::Attribute(i, k) => (i + 1, k + 1),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
  Nodes(Vec<Node>),
  Str(String),
  Num(f64),
  Bool(bool),
}

#[derive(Debug, Clone, Copy)]
struct Context {
  node: Node,
  position: usize,
  size: usize,
}

/// Run `query` against `document`, returning matched snapshot nodes in document
/// order without duplicates.
///
/// Attribute matches resolve to the element that owns the attribute. Zero matches
/// is an empty result, not an error.
///
/// # Errors
///
/// `QueryEvaluationError` if `index` was not produced together with `document`,
/// or on an internal evaluator fault.
pub fn evaluate(query: &CompiledQuery, document: &Document, index: &NodeIndex) -> LocateResult<Vec<SnapshotId>> {
  if document.generation() != index.generation() || document.len() != index.len() {
    log::error!(
      "query '{}' evaluated against a node index from another serialization",
      query.as_str()
    );
    return Err(LocateError::QueryEvaluationError(
      "document and node index do not belong together".into(),
    ));
  }

  let evaluator = Evaluator { document };
  let root = Context {
    node: Node::Root,
    position: 1,
    size: 1,
  };
  let Value::Nodes(nodes) = evaluator.eval(query.expr(), root)? else {
    return Err(LocateError::QueryEvaluationError(format!(
      "'{}' does not select nodes",
      query.as_str()
    )));
  };

  let mut matched = nodes
    .into_iter()
    .filter_map(|node| match node {
      Node::Root => None,
      Node::Element(i) | Node::Attribute(i, _) => Some(i),
    })
    .map(|i| {
      index.get(i).ok_or_else(|| {
        LocateError::QueryEvaluationError(format!("document element {i} missing from node index"))
      })
    })
    .collect::<LocateResult<Vec<_>>>()?;
  matched.sort_unstable();
  matched.dedup();

  log::debug!("query '{}' matched {} nodes", query.as_str(), matched.len());
  Ok(matched)
}

struct Evaluator<'d> {
  document: &'d Document,
}

impl Evaluator<'_> {
  fn eval(&self, expr: &Expr, ctx: Context) -> LocateResult<Value> {
    Ok(match expr {
      Expr::Or(a, b) => Value::Bool(self.truthy(a, ctx)? || self.truthy(b, ctx)?),
      Expr::And(a, b) => Value::Bool(self.truthy(a, ctx)? && self.truthy(b, ctx)?),
      Expr::Compare(op, a, b) => {
        let lhs = self.eval(a, ctx)?;
        let rhs = self.eval(b, ctx)?;
        Value::Bool(self.compare(*op, &lhs, &rhs))
      }
      Expr::Union(parts) => {
        let mut nodes = Vec::new();
        for part in parts {
          match self.eval(part, ctx)? {
            Value::Nodes(found) => nodes.extend(found),
            other => return Err(type_fault("union operand", &other)),
          }
        }
        Value::Nodes(in_document_order(nodes))
      }
      Expr::Path(path) => Value::Nodes(self.path(path, ctx.node)?),
      Expr::Literal(s) => Value::Str(s.clone()),
      Expr::Number(n) => Value::Num(*n),
      Expr::Call(function, args) => self.call(*function, args, ctx)?,
    })
  }

  fn truthy(&self, expr: &Expr, ctx: Context) -> LocateResult<bool> {
    Ok(to_bool(&self.eval(expr, ctx)?))
  }

  #[allow(clippy::cast_precision_loss)]
  fn call(&self, function: Function, args: &[Expr], ctx: Context) -> LocateResult<Value> {
    let arg = |i: usize| -> LocateResult<Value> {
      let expr = args.get(i).ok_or_else(|| {
        LocateError::QueryEvaluationError(format!("{function:?}() is missing argument {i}"))
      })?;
      self.eval(expr, ctx)
    };

    Ok(match function {
      Function::Position => Value::Num(ctx.position as f64),
      Function::Last => Value::Num(ctx.size as f64),
      Function::Not => Value::Bool(!to_bool(&arg(0)?)),
      Function::Contains => Value::Bool(self.string(&arg(0)?).contains(&self.string(&arg(1)?))),
      Function::StartsWith => Value::Bool(self.string(&arg(0)?).starts_with(&self.string(&arg(1)?))),
      Function::Count => match arg(0)? {
        Value::Nodes(nodes) => Value::Num(nodes.len() as f64),
        other => return Err(type_fault("count() argument", &other)),
      },
      Function::StringLength => {
        let s = if args.is_empty() {
          self.string_value(ctx.node)
        } else {
          self.string(&arg(0)?)
        };
        Value::Num(s.chars().count() as f64)
      }
    })
  }

  fn path(&self, path: &LocationPath, context: Node) -> LocateResult<Vec<Node>> {
    let mut nodes = vec![if path.absolute { Node::Root } else { context }];
    for step in &path.steps {
      nodes = self.step(step, &nodes)?;
    }
    Ok(nodes)
  }

  fn step(&self, step: &Step, inputs: &[Node]) -> LocateResult<Vec<Node>> {
    let mut output = Vec::new();
    for &input in inputs {
      let mut candidates: Vec<Node> = self
        .axis(step.axis, input)
        .into_iter()
        .filter(|&n| self.test(step.axis, &step.test, n))
        .collect();

      for predicate in &step.predicates {
        let size = candidates.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in candidates.into_iter().enumerate() {
          let ctx = Context {
            node,
            position: i + 1,
            size,
          };
          let keep = match self.eval(predicate, ctx)? {
            #[allow(clippy::cast_precision_loss, clippy::float_cmp)]
            Value::Num(n) => n == (i + 1) as f64,
            other => to_bool(&other),
          };
          if keep {
            kept.push(node);
          }
        }
        candidates = kept;
      }
      output.extend(candidates);
    }
    Ok(in_document_order(output))
  }

  /// Nodes along `axis` from `node`, in axis order (reverse axes nearest first).
  fn axis(&self, axis: Axis, node: Node) -> Vec<Node> {
    let doc = self.document;
    match (axis, node) {
      (Axis::SelfAxis, n) => vec![n],
      (Axis::Child, Node::Root) => (!doc.is_empty()).then_some(Node::Element(0)).into_iter().collect(),
      (Axis::Child, Node::Element(i)) => self.children(i).map(Node::Element).collect(),
      (Axis::Descendant, Node::Root) => (0..doc.len()).map(Node::Element).collect(),
      (Axis::Descendant, Node::Element(i)) => self.descendants(i),
      (Axis::DescendantOrSelf, Node::Root | Node::Element(_)) => {
        let mut nodes = vec![node];
        nodes.extend(self.axis(Axis::Descendant, node));
        nodes
      }
      (Axis::Parent, Node::Element(i)) => vec![self.parent(i)],
      (Axis::Parent, Node::Attribute(i, _)) => vec![Node::Element(i)],
      (Axis::Ancestor, Node::Element(_) | Node::Attribute(..)) => {
        std::iter::successors(self.axis(Axis::Parent, node).first().copied(), |&n| {
          self.axis(Axis::Parent, n).first().copied()
        })
        .collect()
      }
      (Axis::AncestorOrSelf, n) => {
        let mut nodes = vec![n];
        nodes.extend(self.axis(Axis::Ancestor, n));
        nodes
      }
      (Axis::FollowingSibling, Node::Element(i)) => {
        self.siblings(i).skip_while(|&s| s != i).skip(1).map(Node::Element).collect()
      }
      (Axis::PrecedingSibling, Node::Element(i)) => {
        let mut before: Vec<Node> = self.siblings(i).take_while(|&s| s != i).map(Node::Element).collect();
        before.reverse();
        before
      }
      (Axis::Attribute, Node::Element(i)) => {
        let count = doc.element(i).map_or(0, |e| e.attributes.len());
        (0..count).map(|k| Node::Attribute(i, k)).collect()
      }
      _ => Vec::new(),
    }
  }

  fn children(&self, i: usize) -> impl Iterator<Item = usize> + '_ {
    self
      .document
      .element(i)
      .map(|e| e.children.as_slice())
      .unwrap_or_default()
      .iter()
      .copied()
  }

  fn siblings(&self, i: usize) -> Box<dyn Iterator<Item = usize> + '_> {
    match self.document.element(i).and_then(|e| e.parent) {
      Some(parent) => Box::new(self.children(parent)),
      None => Box::new(std::iter::once(i)),
    }
  }

  fn parent(&self, i: usize) -> Node {
    self
      .document
      .element(i)
      .and_then(|e| e.parent)
      .map_or(Node::Root, Node::Element)
  }

  fn descendants(&self, i: usize) -> Vec<Node> {
    let mut out = Vec::new();
    let mut stack: Vec<usize> = self.children(i).collect();
    stack.reverse();
    while let Some(next) = stack.pop() {
      out.push(Node::Element(next));
      let first = stack.len();
      stack.extend(self.children(next));
      if let Some(pushed) = stack.get_mut(first..) {
        pushed.reverse();
      }
    }
    out
  }

  fn test(&self, axis: Axis, test: &NodeTest, node: Node) -> bool {
    match (test, node) {
      (NodeTest::AnyNode, _) => true,
      (NodeTest::AnyName, Node::Attribute(..)) => axis == Axis::Attribute,
      (NodeTest::AnyName, Node::Element(_)) => axis != Axis::Attribute,
      (NodeTest::Element(Some(ty)), Node::Element(i)) => {
        self.document.element(i).is_some_and(|e| e.element_type == *ty)
      }
      (NodeTest::Attribute(attr), Node::Attribute(i, k)) => self
        .document
        .element(i)
        .and_then(|e| e.attributes.get(k))
        .is_some_and(|(a, _)| a == attr),
      _ => false,
    }
  }

  fn string_value(&self, node: Node) -> String {
    match node {
      Node::Attribute(i, k) => self
        .document
        .element(i)
        .and_then(|e| e.attributes.get(k))
        .map(|(_, v)| v.clone())
        .unwrap_or_default(),
      // Elements carry no text content.
      Node::Root | Node::Element(_) => String::new(),
    }
  }

  fn string(&self, value: &Value) -> String {
    match value {
      Value::Nodes(nodes) => nodes.first().map(|&n| self.string_value(n)).unwrap_or_default(),
      Value::Str(s) => s.clone(),
      Value::Num(n) => format_number(*n),
      Value::Bool(b) => b.to_string(),
    }
  }

  fn number(&self, value: &Value) -> f64 {
    match value {
      Value::Num(n) => *n,
      Value::Bool(b) => f64::from(u8::from(*b)),
      other => parse_number(&self.string(other)),
    }
  }

  fn compare(&self, op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
    let atoms = |nodes: &[Node]| -> Vec<Value> {
      nodes.iter().map(|&n| Value::Str(self.string_value(n))).collect()
    };
    match (lhs, rhs) {
      (Value::Nodes(a), Value::Nodes(b)) => {
        let right = atoms(b);
        atoms(a)
          .iter()
          .any(|l| right.iter().any(|r| self.compare_atoms(op, l, r)))
      }
      (Value::Nodes(a), Value::Bool(_)) => self.compare_atoms(op, &Value::Bool(!a.is_empty()), rhs),
      (Value::Bool(_), Value::Nodes(b)) => self.compare_atoms(op, lhs, &Value::Bool(!b.is_empty())),
      (Value::Nodes(a), _) => atoms(a).iter().any(|l| self.compare_atoms(op, l, rhs)),
      (_, Value::Nodes(b)) => atoms(b).iter().any(|r| self.compare_atoms(op, lhs, r)),
      _ => self.compare_atoms(op, lhs, rhs),
    }
  }

  #[allow(clippy::float_cmp)]
  fn compare_atoms(&self, op: CompareOp, lhs: &Value, rhs: &Value) -> bool {
    match op {
      CompareOp::Eq | CompareOp::NotEq => {
        let equal = match (lhs, rhs) {
          (Value::Bool(_), _) | (_, Value::Bool(_)) => to_bool(lhs) == to_bool(rhs),
          (Value::Num(_), _) | (_, Value::Num(_)) => self.number(lhs) == self.number(rhs),
          _ => self.string(lhs) == self.string(rhs),
        };
        equal == (op == CompareOp::Eq)
      }
      CompareOp::Lt => self.number(lhs) < self.number(rhs),
      CompareOp::LtEq => self.number(lhs) <= self.number(rhs),
      CompareOp::Gt => self.number(lhs) > self.number(rhs),
      CompareOp::GtEq => self.number(lhs) >= self.number(rhs),
    }
  }
}

fn in_document_order(mut nodes: Vec<Node>) -> Vec<Node> {
  nodes.sort_unstable_by_key(|n| n.order_key());
  nodes.dedup();
  nodes
}

fn to_bool(value: &Value) -> bool {
  match value {
    Value::Nodes(nodes) => !nodes.is_empty(),
    Value::Str(s) => !s.is_empty(),
    Value::Num(n) => *n != 0.0 && !n.is_nan(),
    Value::Bool(b) => *b,
  }
}

fn format_number(n: f64) -> String {
  if n.is_nan() {
    "NaN".into()
  } else if n.is_infinite() {
    String::from(if n > 0.0 { "Infinity" } else { "-Infinity" })
  } else if n == 0.0 {
    "0".into()
  } else {
    n.to_string()
  }
}

/// XPath number syntax only: optional minus, digits, optional fraction.
fn parse_number(s: &str) -> f64 {
  let s = s.trim();
  let digits = s.strip_prefix('-').unwrap_or(s);
  let well_formed = !digits.is_empty()
    && digits != "."
    && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
    && digits.matches('.').count() <= 1;
  if well_formed {
    s.parse().unwrap_or(f64::NAN)
  } else {
    f64::NAN
  }
}

fn type_fault(what: &str, value: &Value) -> LocateError {
  LocateError::QueryEvaluationError(format!("{what} is not a node-set: {value:?}"))
}
