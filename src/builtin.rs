//! Standard Host Namespace
//!
//! [`standard_namespace`] builds the bottom frame every [`NamespaceStack`]
//! starts from: a fixed, closed set of host functions. Higher-order
//! functions (`map`, `filter`, `reduce`, `if`, `branch`,
//! `while`) call back into the evaluator via [`call_value`] rather than
//! reimplementing dispatch.
//!
//! [`NamespaceStack`]: crate::frame::NamespaceStack

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::error::{CalcError, Position, Result};
use crate::interpreter::call_value;
use crate::value::{new_frame, Frame, NativeFn, Value};

/// Builds the bottom frame of a fresh [`NamespaceStack`](crate::frame::NamespaceStack).
///
/// Registers the `pi` constant and every host function this crate exposes
/// to calculator programs. Called once per [`Interpreter::new`](crate::interpreter::Interpreter::new);
/// user code can shadow any of these names in an outer frame without
/// disturbing this one.
///
/// # Returns
/// A [`Frame`] holding `pi` plus one [`Value::Native`] entry per host
/// function listed in the table below.
pub fn standard_namespace() -> Frame {
    let frame = new_frame();
    {
        let mut map = frame.borrow_mut();
        map.insert("pi".to_string(), Value::Float(std::f64::consts::PI));

        for native in [
            native("rt", Some(2), rt),
            native("sqrt", Some(1), sqrt),
            native("cbrt", Some(1), cbrt),
            native("int", Some(1), int_of),
            native("float", Some(1), float_of),
            native("str", Some(1), str_of),
            native("chr", Some(1), chr_of),
            native("ord", Some(1), ord_of),
            native("print", None, print_fn),
            native("println", None, println_fn),
            native("input", Some(0), input_fn),
            native("malloc", Some(1), malloc),
            native("get", Some(2), buffer_get),
            native("set", Some(3), buffer_set),
            native("slice", Some(3), buffer_slice),
            native("len", Some(1), len_of),
            native("map", Some(2), map_fn),
            native("filter", Some(2), filter_fn),
            native("reduce", Some(2), reduce_fn),
            native("if", Some(2), if_fn),
            native("branch", Some(3), branch_fn),
            native("while", Some(2), while_fn),
        ] {
            map.insert(native.name.to_string(), Value::Native(Rc::new(native)));
        }
    }
    frame
}

/// Wraps a Rust function as a [`NativeFn`] entry for [`standard_namespace`].
///
/// # Arguments
/// * `name` - the identifier calculator programs call it by
/// * `arity` - exact argument count required, or `None` for variadic
///   (`print`/`println`)
/// * `func` - the implementation; boxed so it can close over state a bare
///   `fn` pointer couldn't carry
fn native(
    name: &'static str,
    arity: Option<usize>,
    func: impl Fn(&[Value], Position) -> Result<Value> + 'static,
) -> NativeFn {
    NativeFn {
        name,
        arity,
        func: Box::new(func),
    }
}

/// Coerces a value to `f64`, accepting both `Int` and `Float`.
///
/// # Error Cases
/// Returns an `ArgumentsError` naming the offending value's type for
/// anything that isn't a number (`Str`, `Buffer`, `Function`, `Native`).
fn expect_f64(v: &Value, pos: Position) -> Result<f64> {
    v.as_f64()
        .ok_or_else(|| CalcError::arguments_error(format!("expected a number, got {}", v.type_name()), pos))
}

/// Requires an `Int`, rejecting `Float` and every other value kind.
///
/// # Error Cases
/// `ArgumentsError` if the value isn't `Value::Int`.
fn expect_int(v: &Value, pos: Position) -> Result<i64> {
    match v {
        Value::Int(n) => Ok(*n),
        other => Err(CalcError::arguments_error(
            format!("expected an int, got {}", other.type_name()),
            pos,
        )),
    }
}

/// Unwraps the shared buffer handle out of a `Value::Buffer`.
///
/// # Returns
/// The cloned `Rc`, so callers can borrow/mutate it without holding a
/// reference into `args`.
///
/// # Error Cases
/// `ArgumentsError` if the value isn't `Value::Buffer`.
fn expect_buffer(v: &Value, pos: Position) -> Result<Rc<std::cell::RefCell<Vec<Value>>>> {
    match v {
        Value::Buffer(b) => Ok(b.clone()),
        other => Err(CalcError::arguments_error(
            format!("expected a buffer, got {}", other.type_name()),
            pos,
        )),
    }
}

/// `rt(x, n)` — the nth root of `x`, computed as `x.powf(1.0 / n)`.
///
/// # Arguments
/// * `args[0]` - radicand
/// * `args[1]` - root degree
///
/// # Returns
/// Always a `Value::Float`, even when both arguments are integers.
fn rt(args: &[Value], pos: Position) -> Result<Value> {
    let a = expect_f64(&args[0], pos)?;
    let b = expect_f64(&args[1], pos)?;
    Ok(Value::Float(a.powf(1.0 / b)))
}

/// `sqrt(x)` — square root.
///
/// # Error Cases
/// `ArgumentsError` if `x` is negative; this crate has no complex type to
/// fall back to.
fn sqrt(args: &[Value], pos: Position) -> Result<Value> {
    let a = expect_f64(&args[0], pos)?;
    if a < 0.0 {
        return Err(CalcError::arguments_error("sqrt of a negative number", pos));
    }
    Ok(Value::Float(a.sqrt()))
}

/// `cbrt(x)` — cube root. Unlike [`sqrt`], negative inputs are well-defined
/// and accepted.
fn cbrt(args: &[Value], pos: Position) -> Result<Value> {
    Ok(Value::Float(expect_f64(&args[0], pos)?.cbrt()))
}

/// `int(v)` — converts `Int`, `Float` (truncating), or a parseable numeric
/// `Str` to `Value::Int`.
///
/// # Error Cases
/// `ArgumentsError` if `v` is a non-numeric string, a buffer, or a
/// function/native value.
fn int_of(args: &[Value], pos: Position) -> Result<Value> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(f) => Ok(Value::Int(*f as i64)),
        Value::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| CalcError::arguments_error(format!("cannot convert '{s}' to int"), pos)),
        other => Err(CalcError::arguments_error(
            format!("cannot convert {} to int", other.type_name()),
            pos,
        )),
    }
}

/// `float(v)` — the `Float` counterpart to [`int_of`]: converts `Int`,
/// `Float`, or a parseable numeric `Str` to `Value::Float`.
///
/// # Error Cases
/// `ArgumentsError` if `v` is a non-numeric string or a non-numeric type.
fn float_of(args: &[Value], pos: Position) -> Result<Value> {
    match &args[0] {
        Value::Int(n) => Ok(Value::Float(*n as f64)),
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| CalcError::arguments_error(format!("cannot convert '{s}' to float"), pos)),
        other => Err(CalcError::arguments_error(
            format!("cannot convert {} to float", other.type_name()),
            pos,
        )),
    }
}

/// `str(v)` — renders any value via its `Display` impl. Always succeeds.
fn str_of(args: &[Value], _pos: Position) -> Result<Value> {
    Ok(Value::Str(args[0].to_string()))
}

/// `chr(code)` — the character whose Unicode scalar value is `code`, as a
/// one-character string.
///
/// # Error Cases
/// `ArgumentsError` if `code` is negative, out of `u32` range, or not a
/// valid scalar value (e.g. a surrogate).
fn chr_of(args: &[Value], pos: Position) -> Result<Value> {
    let code = expect_int(&args[0], pos)?;
    let code = u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| CalcError::arguments_error(format!("{code} is not a valid character code"), pos))?;
    Ok(Value::Str(code.to_string()))
}

/// `ord(s)` — the inverse of [`chr_of`]: the Unicode scalar value of a
/// single-character string.
///
/// # Error Cases
/// `ArgumentsError` if `s` is not exactly one character.
fn ord_of(args: &[Value], pos: Position) -> Result<Value> {
    match &args[0] {
        Value::Str(s) if s.chars().count() == 1 => {
            Ok(Value::Int(s.chars().next().unwrap() as i64))
        }
        other => Err(CalcError::arguments_error(
            format!("ord expects a single-character string, got {other}"),
            pos,
        )),
    }
}

/// `print(..)` — writes its arguments space-joined to stdout with no
/// trailing newline, flushing immediately so output is visible before the
/// next REPL prompt.
///
/// # Returns
/// The argument count, as `Value::Int` — lets callers chain
/// `print(...)` inside a larger expression without it evaluating to 0.
fn print_fn(args: &[Value], _pos: Position) -> Result<Value> {
    let text: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    print!("{}", text.join(" "));
    let _ = io::stdout().flush();
    Ok(Value::Int(args.len() as i64))
}

/// `println(..)` — like [`print_fn`] but appends a trailing newline.
fn println_fn(args: &[Value], _pos: Position) -> Result<Value> {
    let text: Vec<String> = args.iter().map(|v| v.to_string()).collect();
    println!("{}", text.join(" "));
    Ok(Value::Int(args.len() as i64))
}

/// `input()` — reads one line from stdin, stripping the trailing `\n` (and
/// `\r` before it, for CRLF input).
///
/// # Error Cases
/// `ExternalFunctionError` if the underlying read fails.
fn input_fn(_args: &[Value], pos: Position) -> Result<Value> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| CalcError::external_function_error(format!("input: {e}"), pos))?;
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
    Ok(Value::Str(line))
}

/// `malloc(n)` — allocates a buffer of `n` elements, each zero-filled as
/// `Value::Int(0)`.
///
/// # Error Cases
/// `ArgumentsError` if `n` is negative.
fn malloc(args: &[Value], pos: Position) -> Result<Value> {
    let n = expect_int(&args[0], pos)?;
    if n < 0 {
        return Err(CalcError::arguments_error("malloc size must not be negative", pos));
    }
    Ok(Value::Buffer(Rc::new(std::cell::RefCell::new(vec![
        Value::Int(0);
        n as usize
    ]))))
}

/// `get(buf, i)` — reads element `i` of a buffer.
///
/// # Error Cases
/// `ArgumentsError` if `i` is negative or `>=` the buffer's length.
fn buffer_get(args: &[Value], pos: Position) -> Result<Value> {
    let buf = expect_buffer(&args[0], pos)?;
    let i = expect_int(&args[1], pos)?;
    let items = buf.borrow();
    usize::try_from(i)
        .ok()
        .and_then(|i| items.get(i).cloned())
        .ok_or_else(|| CalcError::arguments_error(format!("index {i} out of bounds"), pos))
}

/// `set(buf, i, v)` — writes `v` into element `i` of a buffer, in place.
///
/// # Returns
/// The value written, so `set(...)` can be used as an expression.
///
/// # Error Cases
/// `ArgumentsError` if `i` is negative or `>=` the buffer's length.
fn buffer_set(args: &[Value], pos: Position) -> Result<Value> {
    let buf = expect_buffer(&args[0], pos)?;
    let i = expect_int(&args[1], pos)?;
    let value = args[2].clone();
    let mut items = buf.borrow_mut();
    let idx = usize::try_from(i)
        .ok()
        .filter(|i| *i < items.len())
        .ok_or_else(|| CalcError::arguments_error(format!("index {i} out of bounds"), pos))?;
    items[idx] = value.clone();
    Ok(value)
}

/// `slice(buf, start, end)` — a new buffer holding a copy of
/// `buf[start..end]`. Negative bounds clamp to 0 rather than erroring.
///
/// # Error Cases
/// `ArgumentsError` if `start > end` or `end` exceeds the buffer's length.
fn buffer_slice(args: &[Value], pos: Position) -> Result<Value> {
    let buf = expect_buffer(&args[0], pos)?;
    let start = expect_int(&args[1], pos)?;
    let end = expect_int(&args[2], pos)?;
    let items = buf.borrow();
    let (start, end) = (start.max(0) as usize, end.max(0) as usize);
    if start > end || end > items.len() {
        return Err(CalcError::arguments_error(
            format!("slice bounds {start}..{end} out of range for a buffer of length {}", items.len()),
            pos,
        ));
    }
    Ok(Value::Buffer(Rc::new(std::cell::RefCell::new(
        items[start..end].to_vec(),
    ))))
}

/// `len(v)` — length of a buffer or string, in elements/bytes of `v`'s own
/// notion of length (see [`Value::len`]).
///
/// # Error Cases
/// `ArgumentsError` for a type with no length (numbers, functions).
fn len_of(args: &[Value], pos: Position) -> Result<Value> {
    args[0]
        .len()
        .map(|n| Value::Int(n as i64))
        .ok_or_else(|| CalcError::arguments_error(format!("{} has no length", args[0].type_name()), pos))
}

/// `map(f, buf)` — a new buffer with `f` applied to each element of `buf`,
/// in order.
///
/// # Error Cases
/// Propagates whatever error the first failing call to `f` raises, via
/// [`call_value`]; later elements are not evaluated.
fn map_fn(args: &[Value], pos: Position) -> Result<Value> {
    let func = args[0].clone();
    let buf = expect_buffer(&args[1], pos)?;
    let items = buf.borrow().clone();
    let mapped: Result<Vec<Value>> = items
        .into_iter()
        .map(|v| call_value(func.clone(), vec![v], pos))
        .collect();
    Ok(Value::Buffer(Rc::new(std::cell::RefCell::new(mapped?))))
}

/// `filter(f, buf)` — a new buffer keeping the elements of `buf` for which
/// `f` returns a truthy value (see [`Value::truthy`]).
fn filter_fn(args: &[Value], pos: Position) -> Result<Value> {
    let func = args[0].clone();
    let buf = expect_buffer(&args[1], pos)?;
    let items = buf.borrow().clone();
    let mut kept = Vec::new();
    for v in items {
        if call_value(func.clone(), vec![v.clone()], pos)?.truthy() {
            kept.push(v);
        }
    }
    Ok(Value::Buffer(Rc::new(std::cell::RefCell::new(kept))))
}

/// `reduce(f, buf)` — left-fold over `buf` with no separate seed argument:
/// the first element seeds the accumulator, matching `functools.reduce`'s
/// no-initializer form.
///
/// # Error Cases
/// `ArgumentsError` if `buf` is empty, since there is then no seed to fold
/// from.
fn reduce_fn(args: &[Value], pos: Position) -> Result<Value> {
    let func = args[0].clone();
    let buf = expect_buffer(&args[1], pos)?;
    let items = buf.borrow().clone();
    let mut iter = items.into_iter();
    let mut acc = iter
        .next()
        .ok_or_else(|| CalcError::arguments_error("reduce of an empty buffer", pos))?;
    for item in iter {
        acc = call_value(func.clone(), vec![acc, item], pos)?;
    }
    Ok(acc)
}

/// `if(cond, then)` — calls the zero-arity `then` callable when `cond` is
/// truthy; otherwise evaluates nothing and yields `0`. Conditionals are
/// host functions, not language syntax, so both branches reach the
/// evaluator through the ordinary [`call_value`] path.
///
/// # Arguments
/// * `args[0]` - the condition value
/// * `args[1]` - a zero-arity function/closure, called only if taken
fn if_fn(args: &[Value], pos: Position) -> Result<Value> {
    if args[0].truthy() {
        call_value(args[1].clone(), vec![], pos)
    } else {
        Ok(Value::Int(0))
    }
}

/// `branch(cond, then, else)` — [`if_fn`] with an explicit else branch;
/// exactly one of `then`/`else` is ever called.
fn branch_fn(args: &[Value], pos: Position) -> Result<Value> {
    if args[0].truthy() {
        call_value(args[1].clone(), vec![], pos)
    } else {
        call_value(args[2].clone(), vec![], pos)
    }
}

/// `while(cond, body)` — repeatedly calls the zero-arity `cond` and `body`
/// callables, evaluating `body` once per truthy `cond` check.
///
/// # Returns
/// The value of the last `body` call, or `0` if `cond` was never truthy.
fn while_fn(args: &[Value], pos: Position) -> Result<Value> {
    let cond = args[0].clone();
    let body = args[1].clone();
    let mut last = Value::Int(0);
    while call_value(cond.clone(), vec![], pos)?.truthy() {
        last = call_value(body.clone(), vec![], pos)?;
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::Interpreter;

    fn run(src: &str) -> Value {
        Interpreter::new().interpret(src).unwrap()
    }

    #[test]
    fn sqrt_of_four() {
        match run("sqrt(4)") {
            Value::Float(f) => assert_eq!(f, 2.0),
            other => panic!("expected Float, got {other:?}"),
        }
    }

    #[test]
    fn malloc_get_set_round_trip() {
        let src = "b=malloc(3)\nset(b,0,9)\nget(b,0)";
        match run(src) {
            Value::Int(n) => assert_eq!(n, 9),
            other => panic!("expected Int, got {other:?}"),
        }
    }

    #[test]
    fn map_doubles_each_element() {
        let src = "b=malloc(3)\nset(b,0,1)\nset(b,1,2)\nset(b,2,3)\ndouble(x)=x*2\nr=map(double,b)\nget(r,2)";
        match run(src) {
            Value::Int(n) => assert_eq!(n, 6),
            other => panic!("expected Int, got {other:?}"),
        }
    }

    #[test]
    fn reduce_sums_a_buffer() {
        let src = "b=malloc(3)\nset(b,0,1)\nset(b,1,2)\nset(b,2,3)\nadd(a,c)=a+c\nreduce(add,b)";
        match run(src) {
            Value::Int(n) => assert_eq!(n, 6),
            other => panic!("expected Int, got {other:?}"),
        }
    }

    #[test]
    fn reduce_of_empty_buffer_errors() {
        let src = "b=malloc(0)\nadd(a,c)=a+c\nreduce(add,b)";
        assert!(Interpreter::new().interpret(src).is_err());
    }

    #[test]
    fn while_counts_up() {
        let src = "i=0\ncond()=i<5\nbody()=(i=i+1)\nwhile(cond,body)\ni";
        match run(src) {
            Value::Int(n) => assert_eq!(n, 5),
            other => panic!("expected Int, got {other:?}"),
        }
    }
}
