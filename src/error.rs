//! Error Handling for the rcalc Calculator Language
//!
//! This module defines the error taxonomy used across the whole compilation
//! and evaluation pipeline: lexer, classifier, resolver passes, shunting-yard
//! builder, and evaluator all fail into the same six-variant `CalcError`.
//!
//! ## Error Categories
//!
//! - **InvalidSyntax** — lexer/classifier/builder rejects structurally
//!   ill-formed input.
//! - **UnknownToken** — the evaluator sees a token it cannot dispatch;
//!   indicates a builder bug or a corrupted postfix stream.
//! - **NameNotFound** — variable lookup fails at every namespace-stack frame.
//! - **ArgumentsError** — arity or kind mismatch on a call (also used for
//!   operand type mismatches on operators).
//! - **ExternalFunctionError** — a host function raised an unexpected
//!   failure.
//! - **NoCode** — the program is empty after stripping whitespace.
//!
//! All variants except `NoCode` carry a source `Position` so a formatted
//! diagnostic (source line, caret, `source:line:col: Kind: message`) can be
//! produced by [`render_diagnostic`].

use std::fmt;

/// A 1-based source location, attached to every lexeme and token produced
/// after the lexer stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// A placeholder used for values synthesized at runtime (e.g. the
    /// result of a closure call) that have no direct source location of
    /// their own.
    pub fn synthetic() -> Self {
        Self { line: 0, column: 0 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Comprehensive error type for every stage of the rcalc pipeline.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CalcError {
    #[error("invalid syntax: {message}")]
    InvalidSyntax { message: String, pos: Position },

    #[error("unknown token: {message}")]
    UnknownToken { message: String, pos: Position },

    #[error("name not found: {name}")]
    NameNotFound { name: String, pos: Position },

    #[error("arguments error: {message}")]
    ArgumentsError { message: String, pos: Position },

    #[error("external function error: {message}")]
    ExternalFunctionError { message: String, pos: Position },

    #[error("no code to execute")]
    NoCode,
}

impl CalcError {
    pub fn invalid_syntax(message: impl Into<String>, pos: Position) -> Self {
        CalcError::InvalidSyntax {
            message: message.into(),
            pos,
        }
    }

    pub fn unknown_token(message: impl Into<String>, pos: Position) -> Self {
        CalcError::UnknownToken {
            message: message.into(),
            pos,
        }
    }

    pub fn name_not_found(name: impl Into<String>, pos: Position) -> Self {
        CalcError::NameNotFound {
            name: name.into(),
            pos,
        }
    }

    pub fn arguments_error(message: impl Into<String>, pos: Position) -> Self {
        CalcError::ArgumentsError {
            message: message.into(),
            pos,
        }
    }

    pub fn external_function_error(message: impl Into<String>, pos: Position) -> Self {
        CalcError::ExternalFunctionError {
            message: message.into(),
            pos,
        }
    }

    /// The short, machine-stable kind name used as the third field of the
    /// `source:line:col: Kind: message` diagnostic line.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CalcError::InvalidSyntax { .. } => "InvalidSyntax",
            CalcError::UnknownToken { .. } => "UnknownToken",
            CalcError::NameNotFound { .. } => "NameNotFound",
            CalcError::ArgumentsError { .. } => "ArgumentsError",
            CalcError::ExternalFunctionError { .. } => "ExternalFunctionError",
            CalcError::NoCode => "NoCode",
        }
    }

    /// The source position this error occurred at, if any. `NoCode` has
    /// none — there is no source to point at.
    pub fn position(&self) -> Option<Position> {
        match self {
            CalcError::InvalidSyntax { pos, .. }
            | CalcError::UnknownToken { pos, .. }
            | CalcError::NameNotFound { pos, .. }
            | CalcError::ArgumentsError { pos, .. }
            | CalcError::ExternalFunctionError { pos, .. } => Some(*pos),
            CalcError::NoCode => None,
        }
    }

    fn message_text(&self) -> String {
        match self {
            CalcError::InvalidSyntax { message, .. } => message.clone(),
            CalcError::UnknownToken { message, .. } => message.clone(),
            CalcError::NameNotFound { name, .. } => name.clone(),
            CalcError::ArgumentsError { message, .. } => message.clone(),
            CalcError::ExternalFunctionError { message, .. } => message.clone(),
            CalcError::NoCode => "program is empty".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;

/// Renders a three-line diagnostic: the offending source line, a caret
/// aligned under the error column, and a `source:line:column: ErrorKind:
/// message` summary line.
///
/// `NoCode` (and any error with a position that doesn't land on a real
/// line of `source`) falls back to just the summary line.
pub fn render_diagnostic(source: &str, err: &CalcError) -> String {
    let Some(pos) = err.position() else {
        return format!("?:?: {}: {}", err.kind_name(), err.message_text());
    };

    let lines: Vec<&str> = source.lines().collect();
    let line_idx = pos.line.checked_sub(1).map(|i| i as usize);
    let Some(line_text) = line_idx.and_then(|i| lines.get(i)) else {
        return format!(
            "{}:{}: {}: {}",
            pos,
            pos,
            err.kind_name(),
            err.message_text()
        );
    };

    let caret_col = pos.column.saturating_sub(1) as usize;
    let caret_line = format!("{}^", " ".repeat(caret_col));

    format!(
        "{line_text}\n{caret_line}\nsource:{}:{}: {}: {}",
        pos.line,
        pos.column,
        err.kind_name(),
        err.message_text()
    )
}
