//! Unary Resolver, Definition Marker, Body Extractor and Line Splitter
//!
//! This module keeps the unary-resolution, attribute-marking,
//! assignment-marking, and function-body-extraction passes together: they
//! all operate on the same flat `Vec<Token>` shape and hand off directly
//! into one another.
//!
//! One deliberate reordering relative to a naive reading of the pipeline:
//! line splitting runs *first* here, not last, so the later passes can
//! treat "start of the token list" as "start of a line" without threading
//! newline state through them separately. This only changes when the split
//! happens, not what each pass does — see `DESIGN.md`.

use std::collections::VecDeque;

use crate::error::{CalcError, Position, Result};
use crate::token::{OpKind, Token, TokenKind, UnaryKind};

/// Splits a flat token stream into independent top-level lines.
///
/// A newline terminates the current line unless it appears inside an open
/// parenthesis or immediately after a binary/assignment operator — both
/// cases mean the statement obviously isn't finished yet, so the newline is
/// swallowed as whitespace instead. Empty lines (consecutive newlines, or
/// leading/trailing ones) are dropped.
pub fn split_lines(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut lines = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut depth = 0i32;

    for tok in tokens {
        match &tok.kind {
            TokenKind::Newline => {
                let continues = depth > 0
                    || matches!(current.last().map(|t| &t.kind), Some(TokenKind::Op(_)));
                if !continues && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                // swallowed otherwise: continuation or a blank line
            }
            TokenKind::LParen => {
                depth += 1;
                current.push(tok);
            }
            TokenKind::RParen => {
                depth -= 1;
                current.push(tok);
            }
            _ => current.push(tok),
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// Collapses every run of `+`/`-` operators into a single unary token,
/// emitting the run's leading operator as a binary token first whenever the
/// run follows a completed operand.
pub fn resolve_unary(tokens: Vec<Token>) -> Result<Vec<Token>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mode {
        /// Nothing usable has been completed yet at this nesting point:
        /// start of line, right after `(`, or right after `,`/`;`. A run
        /// collected here is entirely unary, no binary operator involved.
        ExpectOperand,
        /// An operand (or a closing `)`) was just completed; the next
        /// operator run's first member is a binary operator.
        AfterOperand,
    }

    let mut mode = Mode::ExpectOperand;
    let mut pending: Vec<Token> = Vec::new();
    let mut pending_is_binary_run = false;
    let mut result = Vec::with_capacity(tokens.len());
    let mut last_pos = Position::synthetic();

    for tok in tokens {
        last_pos = tok.pos;

        if let TokenKind::Op(_) = &tok.kind {
            if mode == Mode::AfterOperand {
                pending_is_binary_run = true;
            }
            pending.push(tok);
            mode = Mode::ExpectOperand;
            continue;
        }

        match &tok.kind {
            TokenKind::Comma | TokenKind::Semicolon => {
                if !pending.is_empty() {
                    return Err(CalcError::invalid_syntax("missing last operand", tok.pos));
                }
                result.push(tok);
                mode = Mode::ExpectOperand;
            }
            TokenKind::RParen => {
                if !pending.is_empty() {
                    return Err(CalcError::invalid_syntax("missing last operand", tok.pos));
                }
                result.push(tok);
                mode = Mode::AfterOperand;
            }
            TokenKind::LParen => {
                flush_pending(&mut pending, pending_is_binary_run, &mut result)?;
                pending_is_binary_run = false;
                result.push(tok);
                mode = Mode::ExpectOperand;
            }
            _ => {
                flush_pending(&mut pending, pending_is_binary_run, &mut result)?;
                pending_is_binary_run = false;
                result.push(tok);
                mode = Mode::AfterOperand;
            }
        }
    }

    if !pending.is_empty() {
        return Err(CalcError::invalid_syntax("incomplete expression", last_pos));
    }

    Ok(result)
}

fn flush_pending(
    pending: &mut Vec<Token>,
    is_binary_run: bool,
    result: &mut Vec<Token>,
) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }

    if is_binary_run {
        result.push(pending.remove(0));
    }

    if !pending.is_empty() {
        let unary = collapse_unary(pending)?;
        result.push(Token::new(TokenKind::UnaryOp(unary), pending[0].pos));
    }

    pending.clear();
    Ok(())
}

/// Folds a run of `+`/`-` tokens into one unary sign: odd number of `-` is
/// `Neg`, otherwise `Pos`. Any other operator caught in the run is a
/// disallowed unary.
fn collapse_unary(run: &[Token]) -> Result<UnaryKind> {
    let mut neg_count = 0u32;
    for tok in run {
        match &tok.kind {
            TokenKind::Op(OpKind::Add) => {}
            TokenKind::Op(OpKind::Sub) => neg_count += 1,
            TokenKind::Op(op) => {
                return Err(CalcError::invalid_syntax(
                    format!("disallowed unary operator: {op:?}"),
                    tok.pos,
                ));
            }
            _ => unreachable!("collapse_unary only ever receives Op tokens"),
        }
    }
    Ok(if neg_count % 2 == 0 {
        UnaryKind::Pos
    } else {
        UnaryKind::Neg
    })
}

/// Forward pre-pass: any `Var` immediately following a `.` is re-typed as
/// an `Attr` — it names an attribute, never a variable to look up.
pub fn mark_attributes(tokens: &mut [Token]) {
    let mut after_dot = false;
    for tok in tokens.iter_mut() {
        if after_dot {
            if let TokenKind::Var(name) = &tok.kind {
                tok.kind = TokenKind::Attr(name.clone());
            }
        }
        after_dot = matches!(tok.kind, TokenKind::Op(OpKind::Dot));
    }
}

/// Right-to-left scan recognizing the three assignment shapes: `name =
/// expr`, `name(params) = expr` and `(params) = expr`. Everything
/// else passes through untouched.
pub fn mark_assignments(tokens: Vec<Token>) -> Result<Vec<Token>> {
    enum State {
        Other,
        SawEq(Position),
        Arg {
            params: Vec<String>,
        },
        ArgComma {
            params: Vec<String>,
        },
        FuncName {
            params: Vec<String>,
            open_pos: Position,
        },
    }

    let n = tokens.len();
    let mut i = n;
    let mut out: VecDeque<Token> = VecDeque::new();
    let mut state = State::Other;

    while i > 0 {
        i -= 1;
        let tok = tokens[i].clone();

        state = match state {
            State::Other => {
                if matches!(tok.kind, TokenKind::Op(OpKind::Assign)) {
                    State::SawEq(tok.pos)
                } else {
                    out.push_front(tok);
                    State::Other
                }
            }
            State::SawEq(eq_pos) => match &tok.kind {
                TokenKind::Var(name) => {
                    out.push_front(Token::new(TokenKind::Op(OpKind::Assign), eq_pos));
                    out.push_front(Token::new(TokenKind::DeclTarget(name.clone()), tok.pos));
                    State::Other
                }
                TokenKind::RParen => State::Arg { params: Vec::new() },
                _ => {
                    return Err(CalcError::invalid_syntax(
                        "cannot assign to this expression",
                        tok.pos,
                    ));
                }
            },
            State::Arg { mut params } => match &tok.kind {
                TokenKind::Var(name) => {
                    params.push(name.clone());
                    State::ArgComma { params }
                }
                TokenKind::LParen => State::FuncName {
                    params,
                    open_pos: tok.pos,
                },
                _ => {
                    return Err(CalcError::invalid_syntax(
                        "cannot assign to this expression",
                        tok.pos,
                    ));
                }
            },
            State::ArgComma { params } => match &tok.kind {
                TokenKind::Comma => State::Arg { params },
                TokenKind::LParen => State::FuncName {
                    params,
                    open_pos: tok.pos,
                },
                _ => {
                    return Err(CalcError::invalid_syntax(
                        "cannot assign to this expression",
                        tok.pos,
                    ));
                }
            },
            State::FuncName { params, open_pos } => {
                if let TokenKind::Var(name) = &tok.kind {
                    let mut params = params;
                    params.reverse();
                    out.push_front(Token::new(
                        TokenKind::Def {
                            name: name.clone(),
                            params,
                            body: Vec::new(),
                        },
                        tok.pos,
                    ));
                    State::Other
                } else {
                    // Anonymous lambda: this token wasn't consumed, so it
                    // needs to be seen again under `Other`.
                    i += 1;
                    let mut params = params;
                    params.reverse();
                    out.push_front(Token::new(
                        TokenKind::Def {
                            name: String::new(),
                            params,
                            body: Vec::new(),
                        },
                        open_pos,
                    ));
                    State::Other
                }
            }
        };
    }

    match state {
        State::Other => {}
        State::SawEq(eq_pos) => {
            return Err(CalcError::invalid_syntax(
                "cannot assign to this expression",
                eq_pos,
            ));
        }
        State::Arg { .. } | State::ArgComma { .. } => {
            return Err(CalcError::invalid_syntax(
                "incomplete function definition",
                tokens.first().map(|t| t.pos).unwrap_or_default(),
            ));
        }
        State::FuncName { params, open_pos } => {
            // Anonymous lambda right at the very start of the line: there's
            // no preceding token to return to the output.
            let mut params = params;
            params.reverse();
            out.push_front(Token::new(
                TokenKind::Def {
                    name: String::new(),
                    params,
                    body: Vec::new(),
                },
                open_pos,
            ));
        }
    }

    Ok(out.into())
}

/// Recursively packs the tokens following each empty-bodied `Def` into its
/// `body` field, stopping at a comma or right-paren seen at the
/// definition's own parenthesis depth. Nested definitions are
/// extracted by the recursive call on the collected body.
pub fn extract_bodies(tokens: Vec<Token>) -> Result<Vec<Token>> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;

    while i < tokens.len() {
        let tok = tokens[i].clone();

        let TokenKind::Def { name, params, .. } = tok.kind else {
            out.push(tok);
            i += 1;
            continue;
        };

        i += 1;
        let mut depth = 0i32;
        let mut body_tokens = Vec::new();

        loop {
            match tokens.get(i) {
                None => {
                    if depth > 0 {
                        return Err(CalcError::invalid_syntax(
                            "missing closing parenthesis in function body",
                            tok.pos,
                        ));
                    }
                    break;
                }
                Some(next) => match &next.kind {
                    TokenKind::LParen => {
                        depth += 1;
                        body_tokens.push(next.clone());
                        i += 1;
                    }
                    TokenKind::RParen => {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                        body_tokens.push(next.clone());
                        i += 1;
                    }
                    TokenKind::Comma if depth == 0 => break,
                    _ => {
                        body_tokens.push(next.clone());
                        i += 1;
                    }
                },
            }
        }

        if body_tokens.is_empty() {
            return Err(CalcError::invalid_syntax("function has no body", tok.pos));
        }

        let body = extract_bodies(body_tokens)?;
        out.push(Token::new(TokenKind::Def { name, params, body }, tok.pos));
    }

    Ok(out)
}

/// Runs stages 4 through 6 — unary resolution, attribute/assignment
/// marking, and body extraction — over one already-split line.
pub fn resolve_line(line: Vec<Token>) -> Result<Vec<Token>> {
    let line = resolve_unary(line)?;
    let mut line = line;
    mark_attributes(&mut line);
    let line = mark_assignments(line)?;
    extract_bodies(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{lex, split_operators};
    use crate::token::classify;

    fn resolved(src: &str) -> Vec<Vec<Token>> {
        let tokens = classify(split_operators(lex(src).unwrap()).unwrap()).unwrap();
        split_lines(tokens)
            .into_iter()
            .map(|line| resolve_line(line).unwrap())
            .collect()
    }

    #[test]
    fn leading_unary_run_collapses_by_parity() {
        let lines = resolved("---1");
        assert_eq!(lines.len(), 1);
        assert!(matches!(
            lines[0][0].kind,
            TokenKind::UnaryOp(UnaryKind::Neg)
        ));
    }

    #[test]
    fn binary_then_unary_split_out() {
        let lines = resolved("1+-2");
        let kinds: Vec<_> = lines[0].iter().map(|t| &t.kind).collect();
        assert!(matches!(kinds[1], TokenKind::Op(OpKind::Add)));
        assert!(matches!(kinds[2], TokenKind::UnaryOp(UnaryKind::Neg)));
    }

    #[test]
    fn simple_assignment_marks_decl_target() {
        let lines = resolved("x = 1");
        assert!(matches!(lines[0][0].kind, TokenKind::DeclTarget(_)));
    }

    #[test]
    fn named_function_definition_extracts_body() {
        let lines = resolved("f(x,y)=x+y");
        match &lines[0][0].kind {
            TokenKind::Def { name, params, body } => {
                assert_eq!(name, "f");
                assert_eq!(params, &vec!["x".to_string(), "y".to_string()]);
                assert_eq!(body.len(), 3);
            }
            other => panic!("expected Def, got {other:?}"),
        }
    }

    #[test]
    fn anonymous_lambda_has_empty_name() {
        let lines = resolved("(x)=x*2");
        match &lines[0][0].kind {
            TokenKind::Def { name, params, .. } => {
                assert_eq!(name, "");
                assert_eq!(params, &vec!["x".to_string()]);
            }
            other => panic!("expected Def, got {other:?}"),
        }
    }

    #[test]
    fn assigning_to_a_call_is_invalid() {
        let tokens = classify(split_operators(lex("f(1) = 2").unwrap()).unwrap()).unwrap();
        let line = split_lines(tokens).remove(0);
        assert!(resolve_line(line).is_err());
    }

    #[test]
    fn newline_after_binary_operator_continues_the_line() {
        let tokens = classify(split_operators(lex("1 +\n2").unwrap()).unwrap()).unwrap();
        assert_eq!(split_lines(tokens).len(), 1);
    }

    #[test]
    fn newline_inside_parens_continues_the_line() {
        let tokens = classify(split_operators(lex("f(1,\n2)").unwrap()).unwrap()).unwrap();
        assert_eq!(split_lines(tokens).len(), 1);
    }

    #[test]
    fn function_body_stops_at_enclosing_comma() {
        let lines = resolved("reduce((x,y)=x+y,m)");
        // reduce( <def> , m )  -- the def's body must not swallow ", m)"
        match &lines[0][2].kind {
            TokenKind::Def { body, .. } => assert_eq!(body.len(), 3),
            other => panic!("expected Def, got {other:?}"),
        }
    }
}
