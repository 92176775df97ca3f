/*!
Tokenizer for path expressions.
*/

use crate::types::{LocateError, LocateResult};

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Token {
  Slash,
  DoubleSlash,
  LBracket,
  RBracket,
  LParen,
  RParen,
  At,
  Dot,
  DotDot,
  Comma,
  Pipe,
  Star,
  DoubleColon,
  Eq,
  NotEq,
  Lt,
  LtEq,
  Gt,
  GtEq,
  Literal(String),
  Number(f64),
  Name(String),
}

impl Token {
  pub(super) fn describe(&self) -> String {
    match self {
      Self::Literal(s) => format!("string '{s}'"),
      Self::Number(n) => format!("number {n}"),
      Self::Name(n) => format!("'{n}'"),
      other => format!("'{}'", other.symbol()),
    }
  }

  fn symbol(&self) -> &'static str {
    match self {
      Self::Slash => "/",
      Self::DoubleSlash => "//",
      Self::LBracket => "[",
      Self::RBracket => "]",
      Self::LParen => "(",
      Self::RParen => ")",
      Self::At => "@",
      Self::Dot => ".",
      Self::DotDot => "..",
      Self::Comma => ",",
      Self::Pipe => "|",
      Self::Star => "*",
      Self::DoubleColon => "::",
      Self::Eq => "=",
      Self::NotEq => "!=",
      Self::Lt => "<",
      Self::LtEq => "<=",
      Self::Gt => ">",
      Self::GtEq => ">=",
      Self::Literal(_) | Self::Number(_) | Self::Name(_) => "",
    }
  }
}

/// A token and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Spanned {
  pub(super) token: Token,
  pub(super) offset: usize,
}

pub(super) fn invalid(query: &str, offset: usize, reason: impl Into<String>) -> LocateError {
  LocateError::InvalidQuery {
    query: query.to_owned(),
    offset,
    reason: reason.into(),
  }
}

/// `text` from byte `offset` on; empty past the end.
fn from(text: &str, offset: usize) -> &str {
  text.get(offset..).unwrap_or_default()
}

fn is_name_start(c: char) -> bool {
  c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
  c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

pub(super) fn tokenize(query: &str) -> LocateResult<Vec<Spanned>> {
  let mut tokens = Vec::new();
  let mut chars = query.char_indices().peekable();

  while let Some(&(offset, c)) = chars.peek() {
    if c.is_whitespace() {
      chars.next();
      continue;
    }

    let rest = from(query, offset);
    let fixed = [
      ("//", Token::DoubleSlash),
      ("::", Token::DoubleColon),
      ("!=", Token::NotEq),
      ("<=", Token::LtEq),
      (">=", Token::GtEq),
      ("..", Token::DotDot),
    ]
    .into_iter()
    .find(|(symbol, _)| rest.starts_with(symbol));

    let token = if let Some((symbol, token)) = fixed {
      chars.nth(symbol.len() - 1);
      token
    } else if c == '.' && from(rest, 1).starts_with(|d: char| d.is_ascii_digit()) {
      lex_number(query, &mut chars)?
    } else if c.is_ascii_digit() {
      lex_number(query, &mut chars)?
    } else if c == '\'' || c == '"' {
      chars.next();
      let body_start = offset + 1;
      let body = from(query, body_start);
      let Some(literal) = body.find(c).and_then(|len| body.get(..len)) else {
        return Err(invalid(query, offset, "unterminated string literal"));
      };
      let literal = literal.to_owned();
      // Skip the body and closing quote.
      for _ in 0..=literal.chars().count() {
        chars.next();
      }
      Token::Literal(literal)
    } else if is_name_start(c) {
      let mut end = offset;
      while let Some(&(i, n)) = chars.peek() {
        // `a::b` must not swallow the axis separator, and `..` never ends a name.
        if !is_name_char(n) || (n == '.' && from(query, i).starts_with("..")) {
          break;
        }
        end = i + n.len_utf8();
        chars.next();
      }
      Token::Name(query.get(offset..end).unwrap_or_default().to_owned())
    } else {
      chars.next();
      match c {
        '/' => Token::Slash,
        '[' => Token::LBracket,
        ']' => Token::RBracket,
        '(' => Token::LParen,
        ')' => Token::RParen,
        '@' => Token::At,
        '.' => Token::Dot,
        ',' => Token::Comma,
        '|' => Token::Pipe,
        '*' => Token::Star,
        '=' => Token::Eq,
        '<' => Token::Lt,
        '>' => Token::Gt,
        other => return Err(invalid(query, offset, format!("unexpected character '{other}'"))),
      }
    };

    tokens.push(Spanned { token, offset });
  }

  Ok(tokens)
}

fn lex_number(
  query: &str,
  chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
) -> LocateResult<Token> {
  let Some(&(start, _)) = chars.peek() else {
    return Err(invalid(query, query.len(), "expected number"));
  };
  let mut end = start;
  let mut seen_dot = false;
  while let Some(&(i, c)) = chars.peek() {
    if c.is_ascii_digit() || (c == '.' && !seen_dot && !from(query, i).starts_with("..")) {
      seen_dot |= c == '.';
      end = i + 1;
      chars.next();
    } else {
      break;
    }
  }
  query
    .get(start..end)
    .unwrap_or_default()
    .parse()
    .map(Token::Number)
    .map_err(|_| invalid(query, start, "malformed number"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tokens(query: &str) -> Vec<Token> {
    tokenize(query).unwrap().into_iter().map(|s| s.token).collect()
  }

  #[test]
  fn abbreviated_path() {
    assert_eq!(
      tokens("//*[@label='Login']"),
      vec![
        Token::DoubleSlash,
        Token::Star,
        Token::LBracket,
        Token::At,
        Token::Name("label".into()),
        Token::Eq,
        Token::Literal("Login".into()),
        Token::RBracket,
      ]
    );
  }

  #[test]
  fn axes_and_hyphenated_names() {
    assert_eq!(
      tokens("following-sibling::node()"),
      vec![
        Token::Name("following-sibling".into()),
        Token::DoubleColon,
        Token::Name("node".into()),
        Token::LParen,
        Token::RParen,
      ]
    );
  }

  #[test]
  fn numbers_and_dots() {
    assert_eq!(
      tokens("..[1.5 >= .5]"),
      vec![
        Token::DotDot,
        Token::LBracket,
        Token::Number(1.5),
        Token::GtEq,
        Token::Number(0.5),
        Token::RBracket,
      ]
    );
  }

  #[test]
  fn offsets_are_bytes() {
    let spanned = tokenize("//é[@x]").unwrap();
    assert_eq!(spanned[2].offset, 4);
    assert_eq!(spanned[2].token, Token::LBracket);
  }

  #[test]
  fn literals_keep_other_quote_kind() {
    assert_eq!(tokens(r#""it's""#), vec![Token::Literal("it's".into())]);
  }

  #[test]
  fn errors_carry_offsets() {
    assert!(matches!(
      tokenize("//*[@label='Login"),
      Err(LocateError::InvalidQuery { offset: 11, .. })
    ));
    assert!(matches!(
      tokenize("//a[$x]"),
      Err(LocateError::InvalidQuery { offset: 4, .. })
    ));
  }
}
