//! Minimal predicate evaluator for condition nodes.
//!
//! Deliberately minimal — this is the highest scope-creep risk in the
//! engine, so the language is a hard boundary:
//! - field access by dot path (`result.score`, `status`)
//! - comparisons: `==`, `!=`, `>`, `<`, `>=`, `<=`
//! - logical: `&&`, `||`, `!`
//! - literals: string (single or double quoted), number, `true`, `false`,
//!   `null`
//!
//! Numeric comparison coerces through f64, so `1` and `1.0` are equal.
//! A missing field makes any comparison involving it evaluate to `false`
//! (not an error), so conditional branches can safely probe optional data.
//!
//! Not supported (on purpose): parentheses, array indexing, string
//! functions, regex, ternaries.

use serde_json::Value;
use thiserror::Error;

/// Errors from predicate parsing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExpressionError {
    #[error("parse error: {message}")]
    Parse { message: String },
}

fn parse_err(message: impl Into<String>) -> ExpressionError {
    ExpressionError::Parse {
        message: message.into(),
    }
}

/// Evaluate a predicate against a data context (the node's input value).
pub fn evaluate(expression: &str, data: &Value) -> Result<bool, ExpressionError> {
    let tokens = scan(expression)?;
    if tokens.is_empty() {
        return Err(parse_err("empty expression"));
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        data,
    };
    let result = parser.or_expr()?;
    if parser.pos != tokens.len() {
        return Err(parse_err(format!(
            "unexpected token at end: {:?}",
            tokens[parser.pos]
        )));
    }
    Ok(result)
}

/// Resolve a dot path (`a.b.c`) inside a JSON value. `None` when any
/// segment is missing or the parent is not an object.
pub fn lookup_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Path(String),
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    And,
    Or,
    Not,
}

fn scan(input: &str) -> Result<Vec<Tok>, ExpressionError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Eq);
                    i += 2;
                } else {
                    return Err(parse_err("single '=' (use '==')"));
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Ne);
                    i += 2;
                } else {
                    tokens.push(Tok::Not);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Ge);
                    i += 2;
                } else {
                    tokens.push(Tok::Gt);
                    i += 1;
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Tok::Le);
                    i += 2;
                } else {
                    tokens.push(Tok::Lt);
                    i += 1;
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Tok::And);
                    i += 2;
                } else {
                    return Err(parse_err("single '&' (use '&&')"));
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Tok::Or);
                    i += 2;
                } else {
                    return Err(parse_err("single '|' (use '||')"));
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut j = start;
                while j < chars.len() && chars[j] != quote {
                    j += 1;
                }
                if j == chars.len() {
                    return Err(parse_err("unterminated string literal"));
                }
                tokens.push(Tok::Str(chars[start..j].iter().collect()));
                i = j + 1;
            }
            c if c.is_ascii_digit() || (c == '-' && next_is_digit(&chars, i + 1)) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let num = text
                    .parse::<f64>()
                    .map_err(|_| parse_err(format!("invalid number: {text}")))?;
                tokens.push(Tok::Num(num));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "true" => tokens.push(Tok::Bool(true)),
                    "false" => tokens.push(Tok::Bool(false)),
                    "null" => tokens.push(Tok::Null),
                    _ => tokens.push(Tok::Path(word)),
                }
            }
            other => return Err(parse_err(format!("unexpected character: {other:?}"))),
        }
    }

    Ok(tokens)
}

fn next_is_digit(chars: &[char], i: usize) -> bool {
    chars.get(i).is_some_and(|c| c.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Parser / evaluator
// ---------------------------------------------------------------------------

/// A resolved term: either a raw value (possibly missing) or an already
/// boolean result of `!`/comparison.
enum Term {
    Val(Option<Value>),
    Flag(bool),
}

impl Term {
    fn truthy(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            Self::Val(v) => truthy(v.as_ref()),
        }
    }

    fn value(&self) -> Option<Value> {
        match self {
            Self::Flag(b) => Some(Value::Bool(*b)),
            Self::Val(v) => v.clone(),
        }
    }
}

struct Parser<'a> {
    tokens: &'a [Tok],
    pos: usize,
    data: &'a Value,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn or_expr(&mut self) -> Result<bool, ExpressionError> {
        let mut result = self.and_expr()?;
        while self.peek() == Some(&Tok::Or) {
            self.advance();
            // No short-circuit: the right side must still parse cleanly.
            let rhs = self.and_expr()?;
            result = result || rhs;
        }
        Ok(result)
    }

    fn and_expr(&mut self) -> Result<bool, ExpressionError> {
        let mut result = self.comparison()?.truthy();
        while self.peek() == Some(&Tok::And) {
            self.advance();
            let rhs = self.comparison()?.truthy();
            result = result && rhs;
        }
        Ok(result)
    }

    fn comparison(&mut self) -> Result<Term, ExpressionError> {
        let lhs = self.unary()?;
        let op = match self.peek() {
            Some(Tok::Eq) => Cmp::Eq,
            Some(Tok::Ne) => Cmp::Ne,
            Some(Tok::Gt) => Cmp::Gt,
            Some(Tok::Ge) => Cmp::Ge,
            Some(Tok::Lt) => Cmp::Lt,
            Some(Tok::Le) => Cmp::Le,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.unary()?;
        Ok(Term::Flag(compare(lhs.value(), rhs.value(), op)))
    }

    fn unary(&mut self) -> Result<Term, ExpressionError> {
        let mut negations = 0usize;
        while self.peek() == Some(&Tok::Not) {
            self.advance();
            negations += 1;
        }
        let atom = self.atom()?;
        if negations == 0 {
            Ok(atom)
        } else {
            let mut b = atom.truthy();
            if negations % 2 == 1 {
                b = !b;
            }
            Ok(Term::Flag(b))
        }
    }

    fn atom(&mut self) -> Result<Term, ExpressionError> {
        match self.advance() {
            Some(Tok::Path(path)) => Ok(Term::Val(lookup_path(self.data, &path).cloned())),
            Some(Tok::Str(s)) => Ok(Term::Val(Some(Value::String(s)))),
            Some(Tok::Num(n)) => Ok(Term::Val(
                serde_json::Number::from_f64(n).map(Value::Number),
            )),
            Some(Tok::Bool(b)) => Ok(Term::Val(Some(Value::Bool(b)))),
            Some(Tok::Null) => Ok(Term::Val(Some(Value::Null))),
            Some(other) => Err(parse_err(format!("expected a value, found {other:?}"))),
            None => Err(parse_err("expected a value, found end of expression")),
        }
    }
}

#[derive(Clone, Copy)]
enum Cmp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

/// Compare two resolved values. A missing side makes the comparison false.
fn compare(lhs: Option<Value>, rhs: Option<Value>, op: Cmp) -> bool {
    let (Some(lhs), Some(rhs)) = (lhs, rhs) else {
        return false;
    };
    match op {
        Cmp::Eq => values_equal(&lhs, &rhs),
        Cmp::Ne => !values_equal(&lhs, &rhs),
        Cmp::Gt | Cmp::Ge | Cmp::Lt | Cmp::Le => match ordering(&lhs, &rhs) {
            Some(ord) => match op {
                Cmp::Gt => ord.is_gt(),
                Cmp::Ge => ord.is_ge(),
                Cmp::Lt => ord.is_lt(),
                Cmp::Le => ord.is_le(),
                _ => unreachable!(),
            },
            None => false,
        },
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}

fn ordering(lhs: &Value, rhs: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (lhs.as_str(), rhs.as_str()) {
        return Some(a.cmp(b));
    }
    None
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
