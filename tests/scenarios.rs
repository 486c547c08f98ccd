//! End-to-end scenarios driving `rcalc::Interpreter` directly, matching the
//! literal input/output pairs and boundary behaviors of the language
//! definition: arithmetic precedence, right-associative `**`, unary/power
//! interaction, multi-line shared state, user functions, closures over
//! buffers, and the string/escape grammar.

use rcalc::{CalcError, Interpreter, Value};

fn eval(src: &str) -> rcalc::Result<Value> {
    Interpreter::new().interpret(src)
}

fn eval_int(src: &str) -> i64 {
    match eval(src).unwrap_or_else(|e| panic!("{src:?} failed: {e}")) {
        Value::Int(i) => i,
        other => panic!("{src:?} produced non-int {other:?}"),
    }
}

fn eval_float(src: &str) -> f64 {
    match eval(src).unwrap_or_else(|e| panic!("{src:?} failed: {e}")) {
        Value::Float(f) => f,
        other => panic!("{src:?} produced non-float {other:?}"),
    }
}

#[test]
fn scenario_1_precedence() {
    assert_eq!(eval_int("1+2*3"), 7);
}

#[test]
fn scenario_2_power_is_right_associative() {
    assert_eq!(eval_int("2**3**2"), 512);
}

#[test]
fn scenario_3_leading_unary_binds_outside_power() {
    assert_eq!(eval_int("-2**2"), -4);
}

#[test]
fn scenario_4_negative_exponent_yields_float() {
    assert!((eval_float("2**-3") - 0.125).abs() < 1e-12);
}

#[test]
fn scenario_5_assignment_is_shared_across_lines() {
    assert_eq!(eval_int("a=10\na+5"), 15);
}

#[test]
fn scenario_6_user_function_call() {
    assert_eq!(eval_int("f(x,y)=x*y\nf(2+5, 3*2)"), 42);
}

#[test]
fn scenario_7_reduce_over_a_zeroed_buffer() {
    assert_eq!(eval_int("sum(m)=reduce((x,y)=x+y,m)\nsum(malloc(4))"), 0);
}

#[test]
fn scenario_8_stacked_unary_minus() {
    assert_eq!(eval_int("---1"), -1);
    assert_eq!(eval_int("--1"), 1);
}

#[test]
fn scenario_9_host_root_function() {
    assert!((eval_float("rt(25,2)") - 5.0).abs() < 1e-9);
}

#[test]
fn scenario_10_string_escape_embeds_a_real_newline() {
    match eval(r#""a\nb""#).unwrap() {
        Value::Str(s) => assert_eq!(s, "a\nb"),
        other => panic!("expected a string, got {other:?}"),
    }
}

#[test]
fn empty_input_is_no_code() {
    assert!(matches!(eval(""), Err(CalcError::NoCode)));
    assert!(matches!(eval("   \n  "), Err(CalcError::NoCode)));
}

#[test]
fn lone_dot_has_no_operands_to_act_on() {
    assert!(eval(".").is_err());
}

#[test]
fn lone_hex_prefix_is_invalid_syntax() {
    assert!(matches!(eval("0x"), Err(CalcError::InvalidSyntax { .. })));
}

#[test]
fn double_dot_ranges_are_invalid_syntax() {
    assert!(matches!(eval("1..2"), Err(CalcError::InvalidSyntax { .. })));
    assert!(matches!(eval("..5"), Err(CalcError::InvalidSyntax { .. })));
}

#[test]
fn unclosed_call_is_invalid_syntax() {
    assert!(matches!(eval("f(x"), Err(CalcError::InvalidSyntax { .. })));
}

#[test]
fn extra_closing_paren_is_invalid_syntax() {
    assert!(matches!(eval("f(x))"), Err(CalcError::InvalidSyntax { .. })));
}

#[test]
fn chained_assignment_targets_are_rejected() {
    assert!(matches!(eval("a = 1 = 2"), Err(CalcError::InvalidSyntax { .. })));
    assert!(matches!(eval("1 = 2"), Err(CalcError::InvalidSyntax { .. })));
    assert!(matches!(eval("f(1) = 2"), Err(CalcError::InvalidSyntax { .. })));
}

#[test]
fn empty_function_body_is_invalid_syntax() {
    assert!(matches!(eval("f()="), Err(CalcError::InvalidSyntax { .. })));
}

#[test]
fn arity_mismatch_is_an_arguments_error() {
    let result = eval("f(x,y)=x+y\nf(1)");
    assert!(matches!(result, Err(CalcError::ArgumentsError { .. })));
}

#[test]
fn pure_subexpression_is_idempotent() {
    let mut interp = Interpreter::new();
    let first = interp.interpret("3+4*2").unwrap();
    let second = interp.interpret("3+4*2").unwrap();
    assert!(matches!((first, second), (Value::Int(a), Value::Int(b)) if a == b));
}

#[test]
fn ord_and_chr_round_trip() {
    assert_eq!(eval_int("ord(chr(65))"), 65);
}

#[test]
fn closure_sees_outer_assignments_made_before_its_definition() {
    // The closure captures the frame it was defined in by reference, so a
    // later mutation to that same frame through the same handle is visible.
    assert_eq!(eval_int("x=1\nadd(y)=x+y\nx=41\nadd(1)"), 42);
}

#[test]
fn recursive_named_function_via_branch_and_lambdas() {
    let src = "fact(n)=branch(n<=1,()=1,()=n*fact(n-1))\nfact(5)";
    assert_eq!(eval_int(src), 120);
}
