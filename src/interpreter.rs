//! Evaluator and top-level pipeline driver.
//!
//! [`Interpreter`] owns the host (bottom) namespace frame and exposes
//! [`Interpreter::interpret`], which drives every pipeline stage for one
//! call: lex, split operators, classify, split into lines, resolve each
//! line (unary/marker/extractor), build each line's postfix stack, then run
//! the stack machine in [`eval_stack`]. The value of the last line's last
//! statement is the program's result.

use log::debug;

use crate::builder::build_line;
use crate::builtin::standard_namespace;
use crate::error::{CalcError, Position, Result};
use crate::frame::NamespaceStack;
use crate::lexer::{lex, split_operators};
use crate::resolve::{resolve_line, split_lines};
use crate::token::{classify, Number, OpKind, Token, TokenKind, UnaryKind};
use crate::value::{Function, Value};

pub struct Interpreter {
    globals: crate::value::Frame,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self {
            globals: standard_namespace(),
        }
    }

    /// Runs the full pipeline over `source` and returns the value of its
    /// last statement. An all-whitespace (or empty) program is `NoCode`.
    pub fn interpret(&mut self, source: &str) -> Result<Value> {
        if source.trim().is_empty() {
            return Err(CalcError::NoCode);
        }

        let lexemes = split_operators(lex(source)?)?;
        let tokens = classify(lexemes)?;
        let lines = split_lines(tokens);

        if lines.is_empty() {
            return Err(CalcError::NoCode);
        }

        debug!("interpreting {} line(s)", lines.len());

        let mut ns = NamespaceStack::new(self.globals.clone());
        let mut result = None;

        for line in lines {
            let resolved = resolve_line(line)?;
            let postfix = build_line(resolved)?;
            result = Some(eval_stack(&postfix, &mut ns)?);
        }

        Ok(result.expect("a non-empty line list always yields a value"))
    }
}

/// Runs one already-built postfix stack against `ns`, dispatching on each
/// token's kind.
///
/// Literals and resolved variables push directly; operators and calls pop
/// their operands, compute, and push the result — the usual postfix
/// stack-machine shape. `Def` tokens push a closure value and, for named
/// functions, also bind it into `ns` so later calls (including recursive
/// self-calls) can find it by name.
///
/// # Arguments
/// * `tokens` - one line's postfix token stream, as built by `build_line`
/// * `ns` - the namespace stack calls and variable lookups resolve against;
///   mutated in place by `=` and by named `Def`s
///
/// # Returns
/// The single value the stack reduces to.
///
/// # Error Cases
/// `NameNotFound` for an unresolved variable or call target; `ArgumentsError`
/// for type mismatches and arity mismatches; `UnknownToken` if the postfix
/// stack is malformed (underflow, leftover punctuation, or more than one
/// value left at the end) — these indicate a bug upstream in the pipeline
/// rather than a user-facing mistake.
pub fn eval_stack(tokens: &[Token], ns: &mut NamespaceStack) -> Result<Value> {
    let mut stack: Vec<Value> = Vec::new();

    for tok in tokens {
        match &tok.kind {
            TokenKind::Number(Number::Int(n)) => stack.push(Value::Int(*n)),
            TokenKind::Number(Number::Float(n)) => stack.push(Value::Float(*n)),
            TokenKind::Str(s) => stack.push(Value::Str(s.clone())),
            TokenKind::Var(name) => {
                let value = ns
                    .lookup(name)
                    .ok_or_else(|| CalcError::name_not_found(name.clone(), tok.pos))?;
                stack.push(value);
            }
            TokenKind::DeclTarget(name) => stack.push(Value::Str(name.clone())),
            TokenKind::Attr(name) => stack.push(Value::Str(name.clone())),
            TokenKind::UnaryOp(kind) => {
                let operand = pop(&mut stack, tok.pos)?;
                stack.push(apply_unary(*kind, operand, tok.pos)?);
            }
            TokenKind::Op(OpKind::Assign) => {
                let rhs = pop(&mut stack, tok.pos)?;
                let lhs = pop(&mut stack, tok.pos)?;
                let Value::Str(name) = lhs else {
                    return Err(CalcError::invalid_syntax(
                        "left-hand side of '=' is not assignable",
                        tok.pos,
                    ));
                };
                ns.assign(&name, rhs.clone());
                stack.push(rhs);
            }
            TokenKind::Op(OpKind::Dot) => {
                let rhs = pop(&mut stack, tok.pos)?;
                let lhs = pop(&mut stack, tok.pos)?;
                let Value::Str(attr) = rhs else {
                    return Err(CalcError::arguments_error(
                        "right-hand side of '.' must be an attribute name",
                        tok.pos,
                    ));
                };
                stack.push(apply_attr(&lhs, &attr, tok.pos)?);
            }
            TokenKind::Op(op) => {
                let rhs = pop(&mut stack, tok.pos)?;
                let lhs = pop(&mut stack, tok.pos)?;
                stack.push(apply_binop(*op, lhs, rhs, tok.pos)?);
            }
            TokenKind::Call { name, argc } => {
                let mut args = Vec::with_capacity(*argc);
                for _ in 0..*argc {
                    args.push(pop(&mut stack, tok.pos)?);
                }
                args.reverse();

                let callee = ns
                    .lookup(name)
                    .ok_or_else(|| CalcError::name_not_found(name.clone(), tok.pos))?;
                stack.push(call_value(callee, args, tok.pos)?);
            }
            TokenKind::Def { name, params, body } => {
                let closure = Value::Function(std::rc::Rc::new(Function {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    closure: ns.snapshot(),
                }));
                if !name.is_empty() {
                    ns.define(name, closure.clone());
                }
                stack.push(closure);
            }
            TokenKind::Semicolon => {
                // Discards the previous sub-expression's value; a leading
                // `;` with nothing before it is simply a no-op.
                stack.pop();
            }
            TokenKind::LParen | TokenKind::RParen | TokenKind::Comma | TokenKind::Newline => {
                return Err(CalcError::unknown_token(
                    "punctuation token reached the evaluator",
                    tok.pos,
                ));
            }
        }
    }

    if stack.len() != 1 {
        return Err(CalcError::unknown_token(
            "postfix stack did not reduce to exactly one value",
            tokens.last().map(|t| t.pos).unwrap_or_default(),
        ));
    }

    Ok(stack.remove(0))
}

fn pop(stack: &mut Vec<Value>, pos: Position) -> Result<Value> {
    stack
        .pop()
        .ok_or_else(|| CalcError::unknown_token("operand stack underflow", pos))
}

/// Invokes a callable value — a user closure or a host function — with
/// already-evaluated arguments.
///
/// A `Value::Function` runs its body through [`eval_stack`] in a fresh
/// [`NamespaceStack`] built from the closure's captured scope chain (not the
/// caller's), so the function sees the variables visible at its definition
/// site, not at its call site. A `Value::Native` calls straight through to
/// its boxed `fn` after an arity check (natives with `arity: None` are
/// variadic and skip the check).
///
/// # Arguments
/// * `callee` - the value being called; anything other than `Function` or
///   `Native` is a type error
/// * `args` - already-evaluated argument values, in source order
///
/// # Error Cases
/// `ArgumentsError` on arity mismatch or if `callee` isn't callable at all;
/// otherwise propagates whatever error the callee's body or native
/// implementation raises.
pub fn call_value(callee: Value, args: Vec<Value>, pos: Position) -> Result<Value> {
    match callee {
        Value::Function(func) => {
            if args.len() != func.params.len() {
                return Err(CalcError::arguments_error(
                    format!(
                        "{} expects {} argument(s), got {}",
                        if func.name.is_empty() {
                            "<lambda>"
                        } else {
                            &func.name
                        },
                        func.params.len(),
                        args.len()
                    ),
                    pos,
                ));
            }

            let mut call_ns = NamespaceStack::from_closure(func.closure.clone());
            for (param, arg) in func.params.iter().zip(args) {
                call_ns.define(param, arg);
            }
            eval_stack(&func.body, &mut call_ns)
        }
        Value::Native(native) => {
            if let Some(arity) = native.arity {
                if args.len() != arity {
                    return Err(CalcError::arguments_error(
                        format!(
                            "{} expects {} argument(s), got {}",
                            native.name,
                            arity,
                            args.len()
                        ),
                        pos,
                    ));
                }
            }
            (native.func)(&args, pos)
        }
        other => Err(CalcError::arguments_error(
            format!("{} is not callable", other.type_name()),
            pos,
        )),
    }
}

fn apply_unary(kind: UnaryKind, operand: Value, pos: Position) -> Result<Value> {
    match (kind, operand) {
        (UnaryKind::Pos, Value::Int(n)) => Ok(Value::Int(n)),
        (UnaryKind::Pos, Value::Float(n)) => Ok(Value::Float(n)),
        (UnaryKind::Neg, Value::Int(n)) => Ok(Value::Int(-n)),
        (UnaryKind::Neg, Value::Float(n)) => Ok(Value::Float(-n)),
        (_, other) => Err(CalcError::arguments_error(
            format!("cannot apply a unary sign to a {}", other.type_name()),
            pos,
        )),
    }
}

fn apply_attr(target: &Value, attr: &str, pos: Position) -> Result<Value> {
    match attr {
        "len" => target.len().map(|n| Value::Int(n as i64)).ok_or_else(|| {
            CalcError::arguments_error(format!("{} has no '.len'", target.type_name()), pos)
        }),
        "name" => target.display_name().map(Value::Str).ok_or_else(|| {
            CalcError::arguments_error(format!("{} has no '.name'", target.type_name()), pos)
        }),
        other => Err(CalcError::arguments_error(
            format!("unknown attribute '.{other}'"),
            pos,
        )),
    }
}

/// Dispatches a binary operator to its evaluation rule. `Assign` and `Dot`
/// never reach here — `eval_stack` handles them directly since they need
/// the raw operand stack (`Assign`'s left side is a name, not a value to
/// evaluate; `Dot`'s right side is an attribute name, not an expression).
///
/// # Arguments
/// * `op` - which operator to apply
/// * `lhs`, `rhs` - already-evaluated operands, in source order
///
/// # Returns
/// `Int` when both operands are `Int` and the operator has an integer rule
/// (e.g. `+`, `-`, `*`, `**` with a non-negative exponent); `Float`
/// otherwise for the arithmetic operators. Comparisons and equality always
/// return `Int(0)`/`Int(1)` as this language's boolean representation.
///
/// # Error Cases
/// `ArgumentsError` for a type mismatch (e.g. a bitwise operator on a
/// non-`Int`, a comparison between unordered types), division/modulo by
/// zero, or values that can't be ordered for `<`/`<=`/`>`/`>=`.
fn apply_binop(op: OpKind, lhs: Value, rhs: Value, pos: Position) -> Result<Value> {
    use OpKind::*;

    match op {
        Add => numeric_or_concat(lhs, rhs, pos, |a, b| a + b, |a, b| a + b),
        Sub => numeric(lhs, rhs, pos, |a, b| a - b, |a, b| a - b),
        Mul => numeric(lhs, rhs, pos, |a, b| a * b, |a, b| a * b),
        Div => true_div(lhs, rhs, pos),
        FloorDiv => floor_div(lhs, rhs, pos),
        Mod => modulo(lhs, rhs, pos),
        Pow => power(lhs, rhs, pos),
        LShift => int_binop(lhs, rhs, pos, |a, b| Ok(a << b)),
        RShift => int_binop(lhs, rhs, pos, |a, b| Ok(a >> b)),
        BitAnd => int_binop(lhs, rhs, pos, |a, b| Ok(a & b)),
        BitOr => int_binop(lhs, rhs, pos, |a, b| Ok(a | b)),
        BitXor => int_binop(lhs, rhs, pos, |a, b| Ok(a ^ b)),
        Eq => Ok(Value::Int(values_equal(&lhs, &rhs) as i64)),
        NotEq => Ok(Value::Int(!values_equal(&lhs, &rhs) as i64)),
        Gt => compare(lhs, rhs, pos, |o| o == std::cmp::Ordering::Greater),
        Ge => compare(lhs, rhs, pos, |o| o != std::cmp::Ordering::Less),
        Lt => compare(lhs, rhs, pos, |o| o == std::cmp::Ordering::Less),
        Le => compare(lhs, rhs, pos, |o| o != std::cmp::Ordering::Greater),
        Assign | Dot => unreachable!("Assign and Dot are handled directly in eval_stack"),
    }
}

fn numeric_or_concat(
    lhs: Value,
    rhs: Value,
    pos: Position,
    fi: impl Fn(i64, i64) -> i64,
    ff: impl Fn(f64, f64) -> f64,
) -> Result<Value> {
    if let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) {
        return Ok(Value::Str(format!("{a}{b}")));
    }
    numeric(lhs, rhs, pos, fi, ff)
}

fn numeric(
    lhs: Value,
    rhs: Value,
    pos: Position,
    fi: impl Fn(i64, i64) -> i64,
    ff: impl Fn(f64, f64) -> f64,
) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(fi(a, b))),
        (a, b) => {
            let (a, b) = require_numeric_pair(a, b, pos)?;
            Ok(Value::Float(ff(a, b)))
        }
    }
}

fn require_numeric_pair(a: Value, b: Value, pos: Position) -> Result<(f64, f64)> {
    let af = a.as_f64().ok_or_else(|| mismatched_operand_error(&a, pos))?;
    let bf = b.as_f64().ok_or_else(|| mismatched_operand_error(&b, pos))?;
    Ok((af, bf))
}

fn mismatched_operand_error(v: &Value, pos: Position) -> CalcError {
    CalcError::arguments_error(format!("expected a number, got {}", v.type_name()), pos)
}

fn true_div(lhs: Value, rhs: Value, pos: Position) -> Result<Value> {
    let a = lhs.as_f64().ok_or_else(|| mismatched_operand_error(&lhs, pos))?;
    let b = rhs.as_f64().ok_or_else(|| mismatched_operand_error(&rhs, pos))?;
    if b == 0.0 {
        return Err(CalcError::arguments_error("division by zero", pos));
    }
    Ok(Value::Float(a / b))
}

fn floor_div(lhs: Value, rhs: Value, pos: Position) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) {
        if *b == 0 {
            return Err(CalcError::arguments_error("division by zero", pos));
        }
        let q = a / b;
        let r = a % b;
        let adjusted = if r != 0 && (r < 0) != (*b < 0) { q - 1 } else { q };
        return Ok(Value::Int(adjusted));
    }
    let a = lhs.as_f64().ok_or_else(|| mismatched_operand_error(&lhs, pos))?;
    let b = rhs.as_f64().ok_or_else(|| mismatched_operand_error(&rhs, pos))?;
    if b == 0.0 {
        return Err(CalcError::arguments_error("division by zero", pos));
    }
    Ok(Value::Float((a / b).floor()))
}

fn modulo(lhs: Value, rhs: Value, pos: Position) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) {
        if *b == 0 {
            return Err(CalcError::arguments_error("modulo by zero", pos));
        }
        let r = a % b;
        let adjusted = if r != 0 && (r < 0) != (*b < 0) { r + b } else { r };
        return Ok(Value::Int(adjusted));
    }
    let a = lhs.as_f64().ok_or_else(|| mismatched_operand_error(&lhs, pos))?;
    let b = rhs.as_f64().ok_or_else(|| mismatched_operand_error(&rhs, pos))?;
    if b == 0.0 {
        return Err(CalcError::arguments_error("modulo by zero", pos));
    }
    let r = a % b;
    Ok(Value::Float(if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r + b
    } else {
        r
    }))
}

fn power(lhs: Value, rhs: Value, pos: Position) -> Result<Value> {
    if let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) {
        if *b >= 0 {
            if let Ok(exp) = u32::try_from(*b) {
                if let Some(result) = a.checked_pow(exp) {
                    return Ok(Value::Int(result));
                }
            }
        }
        return Ok(Value::Float((*a as f64).powf(*b as f64)));
    }
    let a = lhs.as_f64().ok_or_else(|| mismatched_operand_error(&lhs, pos))?;
    let b = rhs.as_f64().ok_or_else(|| mismatched_operand_error(&rhs, pos))?;
    Ok(Value::Float(a.powf(b)))
}

fn int_binop(
    lhs: Value,
    rhs: Value,
    pos: Position,
    f: impl Fn(i64, i64) -> Result<i64>,
) -> Result<Value> {
    let Value::Int(a) = lhs else {
        return Err(CalcError::arguments_error(
            format!("expected an int, got {}", lhs.type_name()),
            pos,
        ));
    };
    let Value::Int(b) = rhs else {
        return Err(CalcError::arguments_error(
            format!("expected an int, got {}", rhs.type_name()),
            pos,
        ));
    };
    Ok(Value::Int(f(a, b)?))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => *x as f64 == *y,
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => false,
    }
}

fn compare(
    lhs: Value,
    rhs: Value,
    pos: Position,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value> {
    let ordering = match (&lhs, &rhs) {
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        _ => {
            let a = lhs.as_f64().ok_or_else(|| mismatched_operand_error(&lhs, pos))?;
            let b = rhs.as_f64().ok_or_else(|| mismatched_operand_error(&rhs, pos))?;
            a.partial_cmp(&b)
        }
    };
    let ordering = ordering.ok_or_else(|| {
        CalcError::arguments_error("values are not ordered with respect to each other", pos)
    })?;
    Ok(Value::Int(accept(ordering) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(src: &str) -> Value {
        Interpreter::new().interpret(src).unwrap()
    }

    fn as_int(v: Value) -> i64 {
        match v {
            Value::Int(n) => n,
            other => panic!("expected Int, got {other:?}"),
        }
    }

    fn as_float(v: Value) -> f64 {
        match v {
            Value::Float(n) => n,
            other => panic!("expected Float, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(as_int(run("1+2*3")), 7);
    }

    #[test]
    fn power_is_right_associative() {
        assert_eq!(as_int(run("2**3**2")), 512);
    }

    #[test]
    fn negative_exponent_yields_float() {
        assert_eq!(as_float(run("2**-3")), 0.125);
    }

    #[test]
    fn named_function_definition_and_call() {
        assert_eq!(as_int(run("f(x,y)=x+y\nf(2,3)")), 5);
    }

    #[test]
    fn closure_captures_defining_scope() {
        assert_eq!(as_int(run("x=10\nf()=x\nx=20\nf()")), 20);
    }

    #[test]
    fn assignment_after_a_call_does_not_leak_into_its_returned_closure() {
        // A call's own parameter frame is gone once it returns; a later
        // same-named outer assignment must not retroactively change a value
        // already captured and returned from that call.
        let src = "g(x)=(h()=x)\nf=g(1)\nx=99\nf()";
        assert_eq!(as_int(run(src)), 1);
    }

    #[test]
    fn name_not_found_is_reported() {
        assert!(Interpreter::new().interpret("y").is_err());
    }

    #[test]
    fn empty_program_is_no_code() {
        assert!(matches!(
            Interpreter::new().interpret("   "),
            Err(CalcError::NoCode)
        ));
    }

    #[test]
    fn semicolon_discards_previous_value() {
        assert_eq!(as_int(run("1;2;3")), 3);
    }

    #[test]
    fn dot_len_on_a_string() {
        assert_eq!(as_int(run("\"hello\".len")), 5);
    }

    #[test]
    fn string_concatenation_via_plus() {
        match run("\"a\"+\"b\"") {
            Value::Str(s) => assert_eq!(s, "ab"),
            other => panic!("expected Str, got {other:?}"),
        }
    }
}
