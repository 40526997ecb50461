//! Breakpoint condition sublanguage.
//!
//! ```text
//! expr       := or
//! or         := and ( "||" and )*
//! and        := not ( "&&" not )*
//! not        := "!" not | primary
//! primary    := "(" expr ")" | comparison
//! comparison := operand OP operand
//! operand    := path | literal | "hit_count"
//! OP         := "==" | "!=" | "<" | "<=" | ">" | ">="
//! literal    := INT | STRING | "true" | "false" | "null"
//! ```
//!
//! Validation happens at set time and reports the offending character
//! position. Evaluation runs inside the hit callback against the current
//! frame; any path failure there is a condition error, which pauses the
//! target with the error attached to the hit.

use std::fmt;

/// A parsed, validated condition.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Condition {
    pub source: String,
    expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Cmp {
        lhs: Operand,
        op: CmpOp,
        rhs: Operand,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    HitCount,
    Path(String),
    Int(i64),
    Str(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        };
        f.write_str(text)
    }
}

/// Set-time validation failure with the offending character position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConditionError {
    pub message: String,
    pub position: u32,
}

/// A value a condition operand resolves to at hit time.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CondValue {
    Int(i64),
    UInt(u64),
    Bool(bool),
    Str(String),
    /// Non-null object reference.
    Ref(u64),
    Null,
}

/// The frame-side capability evaluation needs.
pub(crate) trait ConditionScope {
    fn hit_count(&self) -> u64;
    fn resolve(&self, path: &str) -> Result<CondValue, String>;
}

// ---------------------------------------------------------------- lexing

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Int(i64),
    Str(String),
    AndAnd,
    OrOr,
    Bang,
    LParen,
    RParen,
    Op(CmpOp),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    position: u32,
}

fn lex(source: &str) -> Result<Vec<Token>, ConditionError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut at = 0usize;
    while at < bytes.len() {
        let start = at;
        let byte = bytes[at];
        match byte {
            b' ' | b'\t' | b'\r' | b'\n' => {
                at += 1;
            }
            b'(' => {
                tokens.push(token(TokenKind::LParen, start));
                at += 1;
            }
            b')' => {
                tokens.push(token(TokenKind::RParen, start));
                at += 1;
            }
            b'&' => {
                if bytes.get(at + 1) == Some(&b'&') {
                    tokens.push(token(TokenKind::AndAnd, start));
                    at += 2;
                } else {
                    return Err(error("expected '&&'", start));
                }
            }
            b'|' => {
                if bytes.get(at + 1) == Some(&b'|') {
                    tokens.push(token(TokenKind::OrOr, start));
                    at += 2;
                } else {
                    return Err(error("expected '||'", start));
                }
            }
            b'=' => {
                if bytes.get(at + 1) == Some(&b'=') {
                    tokens.push(token(TokenKind::Op(CmpOp::Eq), start));
                    at += 2;
                } else {
                    return Err(error("expected '==' (assignment is not allowed)", start));
                }
            }
            b'!' => {
                if bytes.get(at + 1) == Some(&b'=') {
                    tokens.push(token(TokenKind::Op(CmpOp::Ne), start));
                    at += 2;
                } else {
                    tokens.push(token(TokenKind::Bang, start));
                    at += 1;
                }
            }
            b'<' => {
                if bytes.get(at + 1) == Some(&b'=') {
                    tokens.push(token(TokenKind::Op(CmpOp::Le), start));
                    at += 2;
                } else {
                    tokens.push(token(TokenKind::Op(CmpOp::Lt), start));
                    at += 1;
                }
            }
            b'>' => {
                if bytes.get(at + 1) == Some(&b'=') {
                    tokens.push(token(TokenKind::Op(CmpOp::Ge), start));
                    at += 2;
                } else {
                    tokens.push(token(TokenKind::Op(CmpOp::Gt), start));
                    at += 1;
                }
            }
            b'"' => {
                let mut literal = String::new();
                at += 1;
                loop {
                    match bytes.get(at) {
                        None => return Err(error("unterminated string literal", start)),
                        Some(b'"') => {
                            at += 1;
                            break;
                        }
                        Some(b'\\') => match bytes.get(at + 1) {
                            Some(b'"') => {
                                literal.push('"');
                                at += 2;
                            }
                            Some(b'\\') => {
                                literal.push('\\');
                                at += 2;
                            }
                            _ => return Err(error("invalid escape in string literal", at)),
                        },
                        Some(_) => {
                            // take the full UTF-8 character
                            let rest = &source[at..];
                            let ch = rest.chars().next().unwrap_or('\u{fffd}');
                            literal.push(ch);
                            at += ch.len_utf8();
                        }
                    }
                }
                tokens.push(token(TokenKind::Str(literal), start));
            }
            b'0'..=b'9' => {
                let mut end = at;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                let text = &source[at..end];
                let value: i64 = text
                    .parse()
                    .map_err(|_| error("integer literal out of range", start))?;
                tokens.push(token(TokenKind::Int(value), start));
                at = end;
            }
            b'-' => {
                let mut end = at + 1;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }
                if end == at + 1 {
                    return Err(error("unexpected '-'", start));
                }
                let value: i64 = source[at..end]
                    .parse()
                    .map_err(|_| error("integer literal out of range", start))?;
                tokens.push(token(TokenKind::Int(value), start));
                at = end;
            }
            _ if is_ident_start(byte) => {
                let mut end = at;
                while end < bytes.len() && is_ident_part(bytes[end]) {
                    end += 1;
                }
                tokens.push(token(TokenKind::Ident(source[at..end].to_string()), start));
                at = end;
            }
            _ => return Err(error("unknown token", start)),
        }
    }
    Ok(tokens)
}

fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_ident_part(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'.'
}

fn token(kind: TokenKind, position: usize) -> Token {
    Token {
        kind,
        position: u32::try_from(position).unwrap_or(u32::MAX),
    }
}

fn error(message: &str, position: usize) -> ConditionError {
    ConditionError {
        message: message.to_string(),
        position: u32::try_from(position).unwrap_or(u32::MAX),
    }
}

// --------------------------------------------------------------- parsing

struct Parser {
    tokens: Vec<Token>,
    at: usize,
    end: u32,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.at)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.at).cloned();
        if token.is_some() {
            self.at += 1;
        }
        token
    }

    fn here(&self) -> u32 {
        self.peek().map_or(self.end, |token| token.position)
    }

    fn parse_expr(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::OrOr)) {
            self.next();
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ConditionError> {
        let mut lhs = self.parse_not()?;
        while matches!(self.peek().map(|t| &t.kind), Some(TokenKind::AndAnd)) {
            self.next();
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, ConditionError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Bang)) {
            self.next();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ConditionError> {
        if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::LParen)) {
            self.next();
            let inner = self.parse_expr()?;
            match self.next() {
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => Ok(inner),
                Some(token) => Err(ConditionError {
                    message: "expected ')'".into(),
                    position: token.position,
                }),
                None => Err(ConditionError {
                    message: "unbalanced '('".into(),
                    position: self.end,
                }),
            }
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr, ConditionError> {
        let lhs = self.parse_operand()?;
        let op = match self.next() {
            Some(Token {
                kind: TokenKind::Op(op),
                ..
            }) => op,
            Some(token) => {
                return Err(ConditionError {
                    message: "expected a comparison operator".into(),
                    position: token.position,
                })
            }
            None => {
                return Err(ConditionError {
                    message: "expected a comparison operator".into(),
                    position: self.end,
                })
            }
        };
        let rhs = self.parse_operand()?;
        Ok(Expr::Cmp { lhs, op, rhs })
    }

    fn parse_operand(&mut self) -> Result<Operand, ConditionError> {
        match self.next() {
            Some(Token {
                kind: TokenKind::Int(value),
                ..
            }) => Ok(Operand::Int(value)),
            Some(Token {
                kind: TokenKind::Str(value),
                ..
            }) => Ok(Operand::Str(value)),
            Some(Token {
                kind: TokenKind::Ident(name),
                position,
            }) => match name.as_str() {
                "true" => Ok(Operand::Bool(true)),
                "false" => Ok(Operand::Bool(false)),
                "null" => Ok(Operand::Null),
                "hit_count" => Ok(Operand::HitCount),
                _ => {
                    if name.starts_with('.') || name.ends_with('.') || name.contains("..") {
                        Err(ConditionError {
                            message: format!("malformed path '{name}'"),
                            position,
                        })
                    } else {
                        Ok(Operand::Path(name))
                    }
                }
            },
            Some(token) => Err(ConditionError {
                message: "expected an operand".into(),
                position: token.position,
            }),
            None => Err(ConditionError {
                message: "expected an operand".into(),
                position: self.end,
            }),
        }
    }
}

/// Parse and validate a condition source string.
pub(crate) fn parse(source: &str) -> Result<Condition, ConditionError> {
    let trimmed_len = u32::try_from(source.len()).unwrap_or(u32::MAX);
    if source.trim().is_empty() {
        return Err(ConditionError {
            message: "condition is empty".into(),
            position: 0,
        });
    }
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens,
        at: 0,
        end: trimmed_len,
    };
    let expr = parser.parse_expr()?;
    if let Some(extra) = parser.peek() {
        return Err(ConditionError {
            message: "unexpected trailing input".into(),
            position: extra.position,
        });
    }
    Ok(Condition {
        source: source.to_string(),
        expr,
    })
}

// ------------------------------------------------------------ evaluation

/// Evaluate a condition against a frame scope. Errors are condition
/// errors: the breakpoint manager pauses and attaches them to the hit.
pub(crate) fn evaluate(
    condition: &Condition,
    scope: &dyn ConditionScope,
) -> Result<bool, String> {
    eval_expr(&condition.expr, scope)
}

fn eval_expr(expr: &Expr, scope: &dyn ConditionScope) -> Result<bool, String> {
    match expr {
        Expr::Or(lhs, rhs) => Ok(eval_expr(lhs, scope)? || eval_expr(rhs, scope)?),
        Expr::And(lhs, rhs) => Ok(eval_expr(lhs, scope)? && eval_expr(rhs, scope)?),
        Expr::Not(inner) => Ok(!eval_expr(inner, scope)?),
        Expr::Cmp { lhs, op, rhs } => {
            let lhs = eval_operand(lhs, scope)?;
            let rhs = eval_operand(rhs, scope)?;
            compare(&lhs, *op, &rhs)
        }
    }
}

fn eval_operand(operand: &Operand, scope: &dyn ConditionScope) -> Result<CondValue, String> {
    match operand {
        Operand::HitCount => Ok(CondValue::UInt(scope.hit_count())),
        Operand::Path(path) => scope.resolve(path),
        Operand::Int(value) => Ok(CondValue::Int(*value)),
        Operand::Str(value) => Ok(CondValue::Str(value.clone())),
        Operand::Bool(value) => Ok(CondValue::Bool(*value)),
        Operand::Null => Ok(CondValue::Null),
    }
}

fn compare(lhs: &CondValue, op: CmpOp, rhs: &CondValue) -> Result<bool, String> {
    use CondValue::{Bool, Int, Null, Ref, Str, UInt};
    match (lhs, rhs) {
        // integers compare with widening
        (Int(_) | UInt(_), Int(_) | UInt(_)) => {
            let lhs = widen(lhs);
            let rhs = widen(rhs);
            Ok(match op {
                CmpOp::Eq => lhs == rhs,
                CmpOp::Ne => lhs != rhs,
                CmpOp::Lt => lhs < rhs,
                CmpOp::Le => lhs <= rhs,
                CmpOp::Gt => lhs > rhs,
                CmpOp::Ge => lhs >= rhs,
            })
        }
        (Str(lhs), Str(rhs)) => match op {
            CmpOp::Eq => Ok(lhs.as_bytes() == rhs.as_bytes()),
            CmpOp::Ne => Ok(lhs.as_bytes() != rhs.as_bytes()),
            _ => Err(format!("operator '{op}' is not defined for strings")),
        },
        (Bool(lhs), Bool(rhs)) => match op {
            CmpOp::Eq => Ok(lhs == rhs),
            CmpOp::Ne => Ok(lhs != rhs),
            _ => Err(format!("operator '{op}' is not defined for booleans")),
        },
        (Null, Null) => match op {
            CmpOp::Eq => Ok(true),
            CmpOp::Ne => Ok(false),
            _ => Err("null only compares with '==' and '!='".into()),
        },
        (Null, Ref(_)) | (Ref(_), Null) => match op {
            CmpOp::Eq => Ok(false),
            CmpOp::Ne => Ok(true),
            _ => Err("null only compares with '==' and '!='".into()),
        },
        (Ref(lhs), Ref(rhs)) => match op {
            CmpOp::Eq => Ok(lhs == rhs),
            CmpOp::Ne => Ok(lhs != rhs),
            _ => Err(format!("operator '{op}' is not defined for references")),
        },
        _ => Err(format!(
            "cannot compare {} with {}",
            kind_name(lhs),
            kind_name(rhs)
        )),
    }
}

fn widen(value: &CondValue) -> i128 {
    match value {
        CondValue::Int(value) => i128::from(*value),
        CondValue::UInt(value) => i128::from(*value),
        _ => 0,
    }
}

fn kind_name(value: &CondValue) -> &'static str {
    match value {
        CondValue::Int(_) | CondValue::UInt(_) => "integer",
        CondValue::Bool(_) => "boolean",
        CondValue::Str(_) => "string",
        CondValue::Ref(_) => "reference",
        CondValue::Null => "null",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapScope {
        hits: u64,
        values: HashMap<&'static str, CondValue>,
    }

    impl ConditionScope for MapScope {
        fn hit_count(&self) -> u64 {
            self.hits
        }

        fn resolve(&self, path: &str) -> Result<CondValue, String> {
            self.values
                .get(path)
                .cloned()
                .ok_or_else(|| format!("unknown identifier '{path}'"))
        }
    }

    fn scope() -> MapScope {
        let mut values = HashMap::new();
        values.insert("count", CondValue::Int(42));
        values.insert("name", CondValue::Str("worker".into()));
        values.insert("flag", CondValue::Bool(true));
        values.insert("this.next", CondValue::Null);
        MapScope { hits: 3, values }
    }

    #[test]
    fn hit_count_comparison() {
        let condition = parse("hit_count == 3").unwrap();
        assert!(evaluate(&condition, &scope()).unwrap());
        let condition = parse("hit_count >= 4").unwrap();
        assert!(!evaluate(&condition, &scope()).unwrap());
    }

    #[test]
    fn boolean_combinators_and_not() {
        let condition = parse("count > 40 && (name == \"worker\" || hit_count < 1)").unwrap();
        assert!(evaluate(&condition, &scope()).unwrap());
        let condition = parse("!(count > 40)").unwrap();
        assert!(!evaluate(&condition, &scope()).unwrap());
    }

    #[test]
    fn null_comparisons() {
        let condition = parse("this.next == null").unwrap();
        assert!(evaluate(&condition, &scope()).unwrap());
        let condition = parse("this.next < null");
        let err = evaluate(&condition.unwrap(), &scope()).unwrap_err();
        assert!(err.contains("null"));
    }

    #[test]
    fn trailing_operator_points_at_end() {
        let err = parse("hit_count >").unwrap_err();
        assert_eq!(err.position, 11);
    }

    #[test]
    fn unbalanced_paren_is_rejected() {
        let err = parse("(hit_count == 1").unwrap_err();
        assert_eq!(err.message, "unbalanced '('");
    }

    #[test]
    fn unknown_token_reports_its_position() {
        let err = parse("hit_count == #").unwrap_err();
        assert_eq!(err.position, 13);
        assert_eq!(err.message, "unknown token");
    }

    #[test]
    fn empty_condition_is_position_zero() {
        let err = parse("   ").unwrap_err();
        assert_eq!(err.position, 0);
    }

    #[test]
    fn path_errors_surface_as_condition_errors() {
        let condition = parse("missing == 1").unwrap();
        let err = evaluate(&condition, &scope()).unwrap_err();
        assert!(err.contains("missing"));
    }

    #[test]
    fn string_equality_is_bytewise() {
        let condition = parse("name != \"Worker\"").unwrap();
        assert!(evaluate(&condition, &scope()).unwrap());
    }
}
