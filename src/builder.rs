//! Shunting-Yard Builder
//!
//! Pipeline stage 8: linearizes one resolved line (output of `resolve.rs`)
//! into a postfix "stack" the evaluator can run left to right with a single
//! operand stack. This is Dijkstra's algorithm with three project-specific
//! extensions:
//!
//! - A nested `Def` token is opaque to the algorithm: its own body is built
//!   recursively, first, and the whole token is then treated exactly like a
//!   literal operand.
//! - A `Var` immediately followed by `(` is a call site: an argument-count
//!   pre-scan runs once over the whole line up front, and each call site
//!   consumes the next count off that queue, in the same left-to-right
//!   order the pre-scan found them in (FIFO).
//! - `;` pops the operator stack down to the nearest open paren/call marker
//!   (same as `,`) and then, unlike `,`, is itself emitted to the output —
//!   the evaluator uses it to discard the previous sub-expression's result
//!   before moving on to the next.

use std::collections::VecDeque;

use crate::error::{CalcError, Position, Result};
use crate::token::{OpKind, Priority, Token, TokenKind};

enum OpEntry {
    /// A plain grouping `(`.
    LParen,
    /// The `(` that opens a call's argument list; carries the already
    /// finalized `Call` token, which only gets pushed to the output once
    /// its matching `)` arrives (all of its arguments must be pushed first).
    Call(Token),
    Op(Token),
}

fn entry_priority(tok: &Token) -> (Priority, bool) {
    match &tok.kind {
        TokenKind::Op(op) => (op.priority(), *op == OpKind::Pow),
        TokenKind::UnaryOp(u) => (u.priority(), false),
        other => unreachable!("only Op/UnaryOp tokens are pushed as OpEntry::Op, got {other:?}"),
    }
}

/// Builds one resolved line into its postfix stack.
pub fn build_line(line: Vec<Token>) -> Result<Vec<Token>> {
    let line = prebuild_defs(line)?;
    let mut argcs: VecDeque<usize> = prescan_argcs(&line).into();

    let mut output: Vec<Token> = Vec::with_capacity(line.len());
    let mut ops: Vec<OpEntry> = Vec::new();

    let mut i = 0;
    while i < line.len() {
        let tok = line[i].clone();

        match &tok.kind {
            TokenKind::Number(_) | TokenKind::Str(_) | TokenKind::DeclTarget(_)
            | TokenKind::Attr(_) | TokenKind::Def { .. } => {
                output.push(tok);
                i += 1;
            }
            TokenKind::Var(name) => {
                if matches!(line.get(i + 1).map(|t| &t.kind), Some(TokenKind::LParen)) {
                    let argc = argcs.pop_front().unwrap_or(0);
                    let call = Token::new(
                        TokenKind::Call {
                            name: name.clone(),
                            argc,
                        },
                        tok.pos,
                    );
                    ops.push(OpEntry::Call(call));
                    i += 2; // consume the Var and its opening '('
                } else {
                    output.push(tok);
                    i += 1;
                }
            }
            TokenKind::LParen => {
                ops.push(OpEntry::LParen);
                i += 1;
            }
            TokenKind::RParen => {
                loop {
                    match ops.pop() {
                        Some(OpEntry::LParen) => break,
                        Some(OpEntry::Call(call)) => {
                            output.push(call);
                            break;
                        }
                        Some(OpEntry::Op(op_tok)) => output.push(op_tok),
                        None => {
                            return Err(CalcError::invalid_syntax("unmatched ')'", tok.pos));
                        }
                    }
                }
                i += 1;
            }
            TokenKind::Comma => {
                loop {
                    match ops.last() {
                        Some(OpEntry::LParen) | Some(OpEntry::Call(_)) => break,
                        Some(OpEntry::Op(_)) => {
                            if let Some(OpEntry::Op(op_tok)) = ops.pop() {
                                output.push(op_tok);
                            }
                        }
                        None => {
                            return Err(CalcError::invalid_syntax(
                                "',' outside of a parameter or argument list",
                                tok.pos,
                            ));
                        }
                    }
                }
                i += 1;
            }
            TokenKind::Semicolon => {
                loop {
                    match ops.last() {
                        Some(OpEntry::LParen) | Some(OpEntry::Call(_)) | None => break,
                        Some(OpEntry::Op(_)) => {
                            if let Some(OpEntry::Op(op_tok)) = ops.pop() {
                                output.push(op_tok);
                            }
                        }
                    }
                }
                output.push(tok);
                i += 1;
            }
            TokenKind::Op(_) | TokenKind::UnaryOp(_) => {
                let (cur_priority, _) = entry_priority(&tok);
                while let Some(OpEntry::Op(_)) = ops.last() {
                    let Some(OpEntry::Op(top_tok)) = ops.last() else {
                        unreachable!()
                    };
                    let (top_priority, top_is_pow) = entry_priority(top_tok);
                    if top_priority >= cur_priority && !top_is_pow {
                        if let Some(OpEntry::Op(t)) = ops.pop() {
                            output.push(t);
                        }
                    } else {
                        break;
                    }
                }
                ops.push(OpEntry::Op(tok));
                i += 1;
            }
            TokenKind::Newline => {
                i += 1;
            }
            TokenKind::Call { .. } => {
                unreachable!("Call tokens only ever arise from this builder, never from resolve.rs")
            }
        }
    }

    while let Some(entry) = ops.pop() {
        match entry {
            OpEntry::Op(t) => output.push(t),
            OpEntry::LParen | OpEntry::Call(_) => {
                return Err(CalcError::invalid_syntax(
                    "unmatched '('",
                    Position::synthetic(),
                ));
            }
        }
    }

    Ok(output)
}

/// Recursively builds every `Def` token's body into its own postfix stack,
/// before the outer line is scanned at all — a `Def` is a single atomic
/// operand to everything around it.
fn prebuild_defs(line: Vec<Token>) -> Result<Vec<Token>> {
    let mut out = Vec::with_capacity(line.len());
    for tok in line {
        if let TokenKind::Def { name, params, body } = tok.kind {
            let body = build_line(body)?;
            out.push(Token::new(TokenKind::Def { name, params, body }, tok.pos));
        } else {
            out.push(tok);
        }
    }
    Ok(out)
}

/// Finds every `Var` immediately followed by `(` and counts its arguments
/// (top-level commas plus one, zero for an empty `()`), left to right. The
/// builder consumes these in the same order via a FIFO queue, so each call
/// site gets its own count without needing to track nesting explicitly.
fn prescan_argcs(line: &[Token]) -> Vec<usize> {
    let mut argcs = Vec::new();
    let mut i = 0;

    while i < line.len() {
        let is_call_site = matches!(line[i].kind, TokenKind::Var(_))
            && matches!(line.get(i + 1).map(|t| &t.kind), Some(TokenKind::LParen));

        if !is_call_site {
            i += 1;
            continue;
        }

        let mut j = i + 2;
        let argc = if matches!(line.get(j).map(|t| &t.kind), Some(TokenKind::RParen)) {
            0
        } else {
            let mut depth = 0i32;
            let mut commas = 0usize;
            loop {
                match line.get(j).map(|t| &t.kind) {
                    None => break,
                    Some(TokenKind::LParen) => {
                        depth += 1;
                        j += 1;
                    }
                    Some(TokenKind::RParen) => {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                        j += 1;
                    }
                    Some(TokenKind::Comma) if depth == 0 => {
                        commas += 1;
                        j += 1;
                    }
                    _ => j += 1,
                }
            }
            commas + 1
        };

        argcs.push(argc);
        i += 1;
    }

    argcs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{lex, split_operators};
    use crate::resolve::{resolve_line, split_lines};
    use crate::token::classify;

    fn built(src: &str) -> Vec<Token> {
        let tokens = classify(split_operators(lex(src).unwrap()).unwrap()).unwrap();
        let mut lines = split_lines(tokens);
        let line = resolve_line(lines.remove(0)).unwrap();
        build_line(line).unwrap()
    }

    fn kind_tags(tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .map(|t| match &t.kind {
                TokenKind::Number(_) => "num".to_string(),
                TokenKind::Var(v) => format!("var:{v}"),
                TokenKind::Op(op) => format!("op:{op:?}"),
                TokenKind::UnaryOp(u) => format!("unary:{u:?}"),
                TokenKind::Call { name, argc } => format!("call:{name}:{argc}"),
                other => format!("{other:?}"),
            })
            .collect()
    }

    #[test]
    fn simple_precedence() {
        let out = built("1+2*3");
        assert_eq!(
            kind_tags(&out),
            vec!["num", "num", "num", "op:Mul", "op:Add"]
        );
    }

    #[test]
    fn pow_is_right_associative() {
        // 2**3**2 -> 2 3 2 ** **  (right-assoc: exponent tower, not (2**3)**2)
        let out = built("2**3**2");
        assert_eq!(
            kind_tags(&out),
            vec!["num", "num", "num", "op:Pow", "op:Pow"]
        );
    }

    #[test]
    fn call_token_follows_its_arguments() {
        let out = built("f(a,b)");
        assert_eq!(kind_tags(&out), vec!["var:a", "var:b", "call:f:2"]);
    }

    #[test]
    fn nested_call_argument_counts_are_independent() {
        let out = built("f(g(1,2),3)");
        assert_eq!(
            kind_tags(&out),
            vec!["num", "num", "call:g:2", "num", "call:f:2"]
        );
    }

    #[test]
    fn empty_call_has_zero_argc() {
        let out = built("f()");
        assert_eq!(kind_tags(&out), vec!["call:f:0"]);
    }

    #[test]
    fn semicolon_is_preserved_in_output() {
        let out = built("x=1;x+2");
        assert!(kind_tags(&out).iter().any(|t| t == "Semicolon"));
    }
}
