//! Lexical Analyzer for the rcalc Calculator Language
//!
//! This module implements the first two stages of the compilation pipeline:
//!
//! 1. **Lexer** — a character-by-character state machine turning raw source
//!    text into an ordered sequence of [`Lexeme`]s, each carrying a
//!    [`Position`].
//! 2. **Operator splitter** — [`split_operators`] takes each raw operator-run
//!    lexeme and peels the longest matching operator off the front; every
//!    character left over becomes its own single-character operator lexeme,
//!    destined to be resolved into a unary sign later in the pipeline.
//!
//! Whitespace (space, tab, carriage return) separates lexemes without being
//! emitted. Newline is emitted as its own lexeme: it survives classification
//! and the marker/extractor passes untouched, and is only consumed by the
//! line splitter (`resolve::split_lines`).

use crate::error::{CalcError, Position, Result};

/// The raw shape of a lexeme, before any operator-run splitting or
/// classification into a [`crate::token::Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexemeKind {
    /// A run of digits, a hexadecimal literal (`0x...`), or a decimal float
    /// (`1.5`, `.5`). Left unparsed — the classifier decides integer vs.
    /// float vs. hex and performs the actual numeric conversion.
    Number,
    /// An identifier: starts with a letter or underscore.
    Literal,
    /// A raw, unsplit run of operator characters (`+`, `-`, `*`, `/`, `%`,
    /// `<`, `>`, `=`, `!`, `&`, `|`, `^`). Always single-character after
    /// [`split_operators`] has run, except for genuine two-character
    /// operators (`**`, `//`, `==`, `!=`, `<<`, `>>`, `<=`, `>=`).
    Operator,
    LParen,
    RParen,
    Comma,
    Semicolon,
    Dot,
    /// A string literal's *inner* content, quotes stripped, escape
    /// sequences still raw (un-decoded — that happens in the classifier).
    Str,
    Newline,
}

/// A raw, typed slice of source text, tagged with its source position.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub kind: LexemeKind,
    pub text: String,
    pub pos: Position,
}

impl Lexeme {
    fn new(kind: LexemeKind, text: impl Into<String>, pos: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }
}

fn is_operator_char(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '%' | '<' | '>' | '=' | '!' | '&' | '|' | '^'
    )
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Scans the source string into a flat sequence of raw [`Lexeme`]s.
///
/// This is a deterministic state machine: at every point exactly one of
/// "between tokens", "in an operator run", "in an identifier/number run",
/// "in a string", or "in a string escape" applies, driven entirely by the
/// current and next character.
pub fn lex(source: &str) -> Result<Vec<Lexeme>> {
    let chars: Vec<char> = source.chars().collect();
    let mut lexemes = Vec::new();
    let mut i = 0usize;
    let mut line = 1u32;
    let mut col = 1u32;

    while i < chars.len() {
        let c = chars[i];

        match c {
            ' ' | '\t' => {
                i += 1;
                col += 1;
            }
            '\r' => {
                i += 1;
            }
            '\n' => {
                lexemes.push(Lexeme::new(LexemeKind::Newline, "\n", Position::new(line, col)));
                i += 1;
                line += 1;
                col = 1;
            }
            '(' => {
                lexemes.push(Lexeme::new(LexemeKind::LParen, "(", Position::new(line, col)));
                i += 1;
                col += 1;
            }
            ')' => {
                lexemes.push(Lexeme::new(LexemeKind::RParen, ")", Position::new(line, col)));
                i += 1;
                col += 1;
            }
            ',' => {
                lexemes.push(Lexeme::new(LexemeKind::Comma, ",", Position::new(line, col)));
                i += 1;
                col += 1;
            }
            ';' => {
                lexemes.push(Lexeme::new(LexemeKind::Semicolon, ";", Position::new(line, col)));
                i += 1;
                col += 1;
            }
            '"' => {
                let start = Position::new(line, col);
                let (text, consumed) = lex_string(&chars, i, start)?;
                lexemes.push(Lexeme::new(LexemeKind::Str, text, start));
                i += consumed;
                col += consumed as u32;
            }
            '.' if chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) => {
                let start = Position::new(line, col);
                let (text, consumed) = lex_run(&chars, i, |c| c.is_ascii_alphanumeric() || c == '.');
                lexemes.push(Lexeme::new(LexemeKind::Number, text, start));
                i += consumed;
                col += consumed as u32;
            }
            '.' => {
                lexemes.push(Lexeme::new(LexemeKind::Dot, ".", Position::new(line, col)));
                i += 1;
                col += 1;
            }
            c if c.is_ascii_digit() => {
                let start = Position::new(line, col);
                let (text, consumed) = lex_run(&chars, i, |c| c.is_ascii_alphanumeric() || c == '.');
                lexemes.push(Lexeme::new(LexemeKind::Number, text, start));
                i += consumed;
                col += consumed as u32;
            }
            c if is_ident_start(c) => {
                let start = Position::new(line, col);
                let (text, consumed) = lex_run(&chars, i, is_ident_continue);
                lexemes.push(Lexeme::new(LexemeKind::Literal, text, start));
                i += consumed;
                col += consumed as u32;
            }
            c if is_operator_char(c) => {
                let start = Position::new(line, col);
                let (text, consumed) = lex_run(&chars, i, is_operator_char);
                lexemes.push(Lexeme::new(LexemeKind::Operator, text, start));
                i += consumed;
                col += consumed as u32;
            }
            other => {
                return Err(CalcError::invalid_syntax(
                    format!("unexpected character '{other}'"),
                    Position::new(line, col),
                ));
            }
        }
    }

    Ok(lexemes)
}

/// Consumes a maximal run of characters satisfying `pred`, starting at `i`.
/// Returns the collected text and the number of `char`s consumed.
fn lex_run(chars: &[char], i: usize, pred: impl Fn(char) -> bool) -> (String, usize) {
    let mut j = i;
    while j < chars.len() && pred(chars[j]) {
        j += 1;
    }
    (chars[i..j].iter().collect(), j - i)
}

/// Consumes a `"`-delimited string starting at `i` (which must point at the
/// opening quote). `\` begins a one-character escape that is copied through
/// verbatim — decoding happens in the token classifier.
fn lex_string(chars: &[char], i: usize, start: Position) -> Result<(String, usize)> {
    let mut j = i + 1;
    let mut buf = String::new();

    loop {
        match chars.get(j) {
            None => {
                return Err(CalcError::invalid_syntax("unterminated string", start));
            }
            Some('"') => {
                j += 1;
                break;
            }
            Some('\\') => {
                let Some(escaped) = chars.get(j + 1) else {
                    return Err(CalcError::invalid_syntax("unterminated string", start));
                };
                buf.push('\\');
                buf.push(*escaped);
                j += 2;
            }
            Some(c) => {
                buf.push(*c);
                j += 1;
            }
        }
    }

    Ok((buf, j - i))
}

/// The closed set of operators the splitter will recognize, longest first
/// so [`longest_match`] naturally prefers `**` over `*`, `<=` over `<`, etc.
const OPERATOR_STRS: &[&str] = &[
    "**", "//", "==", "!=", "<<", ">>", "<=", ">=", "+", "-", "*", "/", "%", "<", ">", "&", "|",
    "^", "=",
];

fn longest_match(s: &str) -> Option<&'static str> {
    OPERATOR_STRS
        .iter()
        .filter(|op| s.starts_with(**op))
        .max_by_key(|op| op.len())
        .copied()
}

/// Splits every raw operator-run lexeme, left-greedily, into one leading
/// binary/assignment operator followed by zero or more trailing
/// single-character operators (destined to become unary signs).
pub fn split_operators(lexemes: Vec<Lexeme>) -> Result<Vec<Lexeme>> {
    let mut out = Vec::with_capacity(lexemes.len());

    for lexeme in lexemes {
        if lexeme.kind != LexemeKind::Operator {
            out.push(lexeme);
            continue;
        }

        let Some(first) = longest_match(&lexeme.text) else {
            return Err(CalcError::invalid_syntax(
                format!(
                    "invalid operator: {}",
                    lexeme.text.chars().next().unwrap_or_default()
                ),
                lexeme.pos,
            ));
        };

        out.push(Lexeme::new(LexemeKind::Operator, first, lexeme.pos));

        let mut col = lexeme.pos.column + first.chars().count() as u32;
        for ch in lexeme.text[first.len()..].chars() {
            out.push(Lexeme::new(
                LexemeKind::Operator,
                ch.to_string(),
                Position::new(lexeme.pos.line, col),
            ));
            col += 1;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<LexemeKind> {
        split_operators(lex(src).unwrap())
            .unwrap()
            .into_iter()
            .map(|l| l.kind)
            .collect()
    }

    #[test]
    fn lexes_simple_arithmetic() {
        let lexemes = split_operators(lex("1+2*3").unwrap()).unwrap();
        let texts: Vec<&str> = lexemes.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "+", "2", "*", "3"]);
    }

    #[test]
    fn splits_multi_char_operators() {
        let lexemes = split_operators(lex("2**3").unwrap()).unwrap();
        assert_eq!(lexemes[1].text, "**");
    }

    #[test]
    fn splits_trailing_unary_run() {
        let lexemes = split_operators(lex("1+--2").unwrap()).unwrap();
        let texts: Vec<&str> = lexemes.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "+", "-", "-", "2"]);
    }

    #[test]
    fn dot_before_digit_is_a_float() {
        assert_eq!(kinds(".5"), vec![LexemeKind::Number]);
    }

    #[test]
    fn lone_dot_is_dot_operator() {
        assert_eq!(kinds("a.b"), vec![
            LexemeKind::Literal,
            LexemeKind::Dot,
            LexemeKind::Literal
        ]);
    }

    #[test]
    fn unterminated_string_is_invalid_syntax() {
        assert!(lex("\"abc").is_err());
    }

    #[test]
    fn newline_is_emitted() {
        assert_eq!(kinds("1\n2"), vec![
            LexemeKind::Number,
            LexemeKind::Newline,
            LexemeKind::Number
        ]);
    }
}
