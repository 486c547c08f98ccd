//! Token Classifier for the rcalc Calculator Language
//!
//! This module implements pipeline stage 3: promoting the flat [`Lexeme`]
//! stream into [`Token`]s. A token carries a richer, two-level shape than a
//! lexeme — `TokenKind` folds "kind" and "type" into one tagged union, plus
//! a decoded value and the originating [`Position`].
//!
//! Numbers are parsed here (hexadecimal by radix-16 of the post-`0x` tail,
//! floats by decimal conversion); strings have their escape sequences
//! decoded here. Everything else — unary resolution, declaration-target /
//! attribute marking, function-definition extraction — happens in later
//! passes (`resolve.rs`) over the `Vec<Token>` this module produces.

use crate::error::{CalcError, Position, Result};
use crate::lexer::{Lexeme, LexemeKind};

/// A calculator-language number: the classifier decides integer vs. float
/// from the lexeme's shape (presence of a `.`, a `0x` prefix).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// Binary/assignment operator kinds. Dot and `=` are included here even
/// though they're punctuation-flavored, because they need a priority for
/// the shunting-yard builder in `builder.rs`. Comma and semicolon are kept
/// as their own `TokenKind` variants instead (they delimit rather than
/// combine operands, so they never appear inside an operator run).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Add,
    Sub,
    Div,
    FloorDiv,
    Mul,
    Pow,
    Mod,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    Dot,
    Assign,
}

/// Only `+` and `-` may ever resolve to a unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryKind {
    Pos,
    Neg,
}

/// Precedence levels from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    None,
    Minimal,
    Medium,
    High,
    Maximal,
}

impl OpKind {
    pub fn priority(self) -> Priority {
        use OpKind::*;
        match self {
            Assign | Eq | NotEq | Gt | Ge | Lt | Le => Priority::None,
            Add | Sub => Priority::Minimal,
            Div | FloorDiv | Mul | Mod | LShift | RShift | BitAnd | BitOr | BitXor => {
                Priority::Medium
            }
            Pow | Dot => Priority::Maximal,
        }
    }

    /// All binary operators are left-associative except `**`, whose
    /// right-associativity is special-cased directly in the builder's pop
    /// rule (`top.priority >= current.priority && top.kind != Pow`).
    pub fn is_right_associative(self) -> bool {
        matches!(self, OpKind::Pow)
    }
}

impl UnaryKind {
    pub fn priority(self) -> Priority {
        Priority::High
    }
}

/// A classified token: a kind plus the source position it came from.
/// `Def.body` is reused across pipeline stages — the marker/extractor
/// passes fill it with a flat `Vec<Token>`, and the shunting-yard builder
/// later replaces it in place with that body's own postfix stack.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub enum TokenKind {
    Number(Number),
    Str(String),
    /// A free variable reference, resolved by namespace-stack lookup.
    Var(String),
    /// An assignment/parameter target — pushed onto the operand stack
    /// verbatim (never looked up) so `=` can read its literal name.
    DeclTarget(String),
    /// An identifier used as a literal attribute name after `.`.
    Attr(String),
    Op(OpKind),
    UnaryOp(UnaryKind),
    LParen,
    RParen,
    Comma,
    Semicolon,
    Newline,
    /// A function call site. `argc` is filled in by the builder's
    /// argument-count pre-scan (see `builder.rs`).
    Call { name: String, argc: usize },
    /// A function (or lambda, when `name` is empty) definition.
    Def {
        name: String,
        params: Vec<String>,
        body: Vec<Token>,
    },
}

impl Token {
    pub fn new(kind: TokenKind, pos: Position) -> Self {
        Self { kind, pos }
    }
}

fn op_kind_for(text: &str) -> Option<OpKind> {
    use OpKind::*;
    Some(match text {
        "+" => Add,
        "-" => Sub,
        "/" => Div,
        "//" => FloorDiv,
        "*" => Mul,
        "**" => Pow,
        "%" => Mod,
        "<<" => LShift,
        ">>" => RShift,
        "&" => BitAnd,
        "|" => BitOr,
        "^" => BitXor,
        "==" => Eq,
        "!=" => NotEq,
        ">" => Gt,
        ">=" => Ge,
        "<" => Lt,
        "<=" => Le,
        "=" => Assign,
        _ => return None,
    })
}

/// Promotes a flat lexeme stream (already operator-split) into tokens.
pub fn classify(lexemes: Vec<Lexeme>) -> Result<Vec<Token>> {
    let mut tokens = Vec::with_capacity(lexemes.len());

    for lexeme in lexemes {
        let kind = match lexeme.kind {
            LexemeKind::Number => TokenKind::Number(parse_number(&lexeme.text, lexeme.pos)?),
            LexemeKind::Literal => TokenKind::Var(lexeme.text),
            LexemeKind::Str => TokenKind::Str(decode_escapes(&lexeme.text, lexeme.pos)?),
            LexemeKind::LParen => TokenKind::LParen,
            LexemeKind::RParen => TokenKind::RParen,
            LexemeKind::Comma => TokenKind::Comma,
            LexemeKind::Semicolon => TokenKind::Semicolon,
            LexemeKind::Newline => TokenKind::Newline,
            LexemeKind::Dot => TokenKind::Op(OpKind::Dot),
            LexemeKind::Operator => {
                let op = op_kind_for(&lexeme.text).ok_or_else(|| {
                    CalcError::invalid_syntax(
                        format!("unrecognized operator: {}", lexeme.text),
                        lexeme.pos,
                    )
                })?;
                TokenKind::Op(op)
            }
        };

        tokens.push(Token::new(kind, lexeme.pos));
    }

    Ok(tokens)
}

fn parse_number(text: &str, pos: Position) -> Result<Number> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if hex.is_empty() {
            return Err(CalcError::invalid_syntax(
                format!("invalid hexadecimal value: {text}"),
                pos,
            ));
        }
        return i64::from_str_radix(hex, 16)
            .map(Number::Int)
            .map_err(|_| CalcError::invalid_syntax(format!("invalid hexadecimal value: {text}"), pos));
    }

    let dot_count = text.matches('.').count();
    if dot_count > 0 && text.len() == dot_count {
        return Err(CalcError::invalid_syntax(format!("invalid float: {text}"), pos));
    }
    if text.ends_with('.') {
        return Err(CalcError::invalid_syntax(format!("invalid float: {text}"), pos));
    }

    if dot_count == 0 {
        return text
            .parse::<i64>()
            .map(Number::Int)
            .map_err(|_| CalcError::invalid_syntax(format!("invalid number: {text}"), pos));
    }
    if dot_count == 1 {
        return text
            .parse::<f64>()
            .map(Number::Float)
            .map_err(|_| CalcError::invalid_syntax(format!("invalid float: {text}"), pos));
    }

    Err(CalcError::invalid_syntax(format!("invalid number: {text}"), pos))
}

/// Decodes the supported escape sequences: `\" \n \r \t \b \f \v
/// \0 \\`. The lexer leaves these raw (backslash followed by one char).
fn decode_escapes(raw: &str, pos: Position) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                return Err(CalcError::invalid_syntax(
                    format!("unknown escape sequence: \\{other}"),
                    pos,
                ));
            }
            None => {
                return Err(CalcError::invalid_syntax("unterminated string", pos));
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{lex, split_operators};

    fn classify_src(src: &str) -> Result<Vec<Token>> {
        classify(split_operators(lex(src)?)?)
    }

    #[test]
    fn parses_integer_and_float() {
        let tokens = classify_src("1 1.5").unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Number(Number::Int(1))));
        assert!(matches!(tokens[1].kind, TokenKind::Number(Number::Float(f)) if f == 1.5));
    }

    #[test]
    fn parses_hex() {
        let tokens = classify_src("0x1F").unwrap();
        assert!(matches!(tokens[0].kind, TokenKind::Number(Number::Int(31))));
    }

    #[test]
    fn bare_0x_is_invalid() {
        assert!(classify_src("0x").is_err());
    }

    #[test]
    fn decodes_string_escapes() {
        let tokens = classify_src("\"a\\nb\"").unwrap();
        match &tokens[0].kind {
            TokenKind::Str(s) => assert_eq!(s, "a\nb"),
            other => panic!("expected string token, got {other:?}"),
        }
    }

    #[test]
    fn double_dot_number_is_invalid() {
        assert!(classify_src("1..2").is_err());
    }
}
