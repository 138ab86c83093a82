//! Core evaluator behavior: the accumulator model, short-circuit forms,
//! truthiness, strings and typed byte streams.

use std::rc::Rc;

use slip::{Interpreter, Value};

fn eval(source: &str) -> Value {
    let interp = Interpreter::new();
    let result = interp.execute(source);
    assert!(
        result.is_success(),
        "unexpected failure: {:?} for {source:?}",
        result.error_message
    );
    result.value
}

fn eval_err(source: &str) -> (u16, String) {
    let interp = Interpreter::new();
    let result = interp.execute(source);
    assert!(!result.is_success(), "expected failure for {source:?}");
    (
        result.error_status.unwrap_or(0),
        result.error_message.unwrap_or_default(),
    )
}

// === Accumulator model ===

#[test]
fn left_to_right_with_no_precedence() {
    let interp = Interpreter::new();
    let result = interp.execute("result: 10 + 5 * 2");
    assert_eq!(result.value, Value::Int(30));
    assert_eq!(interp.get_global("result"), Some(Value::Int(30)));
}

#[test]
fn head_call_collects_arguments() {
    assert_eq!(eval("add 2 3"), Value::Int(5));
    assert_eq!(eval("add 1 2 |mul 3"), Value::Int(9));
}

#[test]
fn unary_pipe_applies_the_accumulator() {
    assert_eq!(eval("double: fn {x} [ x * 2 ]\n5 |double"), Value::Int(10));
}

#[test]
fn value_after_value_is_an_error() {
    let (status, message) = eval_err("1 2");
    assert_eq!(status, 500);
    assert!(message.contains("unexpected value after value"));
}

#[test]
fn empty_script_yields_none() {
    assert_eq!(eval(""), Value::None);
}

#[test]
fn function_references_are_not_auto_called_in_argument_position() {
    // passing a function as a value does not invoke it
    let source = "
        id: fn {x} [ x ]
        pick: fn {f, v} [ f ]
        chosen: pick id 7
        call chosen #[3]
    ";
    assert_eq!(eval(source), Value::Int(3));
}

// === Short-circuit logic ===

#[test]
fn and_skips_the_rhs_when_falsey() {
    let interp = Interpreter::new();
    interp.execute("x: 0");
    let result = interp.execute("(x and (1 / 0))");
    assert!(result.is_success(), "division must not run");
    assert_eq!(result.value, Value::Int(0));
}

#[test]
fn or_skips_the_rhs_when_truthy() {
    assert_eq!(eval("x: 1\n(x or (1 / 0))"), Value::Int(1));
}

#[test]
fn and_evaluates_the_rhs_when_truthy() {
    assert_eq!(eval("1 and 2"), Value::Int(2));
    assert_eq!(eval("0 or 'fallback'"), Value::str("fallback"));
}

// === Truthiness ===

#[test]
fn truthiness_drives_if() {
    assert_eq!(eval("if 0 ['t'] ['f']"), Value::str("f"));
    assert_eq!(eval("if '' ['t'] ['f']"), Value::str("f"));
    assert_eq!(eval("if #[] ['t'] ['f']"), Value::str("f"));
    assert_eq!(eval("if 'x' ['t'] ['f']"), Value::str("t"));
    assert_eq!(eval("if none ['t']"), Value::None);
}

// === Arithmetic ===

#[test]
fn integer_division_stays_integral_when_exact() {
    assert_eq!(eval("10 / 2"), Value::Int(5));
    assert_eq!(eval("7 / 2"), Value::Float(3.5));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let (status, message) = eval_err("1 / 0");
    assert_eq!(status, 500);
    assert!(message.contains("division by zero"));
}

#[test]
fn comparisons_and_not() {
    assert_eq!(eval("3 < 5"), Value::Bool(true));
    assert_eq!(eval("'a' != 'b'"), Value::Bool(true));
    assert_eq!(eval("not 0"), Value::Bool(true));
    assert_eq!(eval("2 >= 2"), Value::Bool(true));
}

// === Strings ===

#[test]
fn raw_strings_are_dedented() {
    assert_eq!(
        eval("'  line one\n    line two\n  line three'"),
        Value::str("line one\n  line two\nline three")
    );
}

#[test]
fn interpolated_strings_render_against_the_lexical_chain() {
    assert_eq!(
        eval("name: 'world'\n\"hello {{name}}\""),
        Value::str("hello world")
    );
}

#[test]
fn istrings_count_as_strings() {
    assert_eq!(eval("\"abc\" = 'abc'"), Value::Bool(true));
}

#[test]
fn string_concatenation() {
    assert_eq!(eval("'foo' + 'bar'"), Value::str("foobar"));
}

// === Typed byte streams ===

#[test]
fn multi_byte_values_are_little_endian() {
    assert_eq!(
        eval("u16#[1, 256]"),
        Value::Bytes(Rc::from(vec![1u8, 0, 0, 1]))
    );
    assert_eq!(
        eval("u32#[1]"),
        Value::Bytes(Rc::from(vec![1u8, 0, 0, 0]))
    );
}

#[test]
fn floats_serialize_ieee_little_endian() {
    assert_eq!(
        eval("f64#[1.5]"),
        Value::Bytes(Rc::from(1.5f64.to_le_bytes().to_vec()))
    );
}

#[test]
fn bit_streams_pack_msb_first_with_zero_padding() {
    // bits 1,0,1 -> 1010_0000
    assert_eq!(eval("b1#[true, false, true]"), Value::Bytes(Rc::from(vec![0xA0u8])));
    // nine bits spill into a second byte
    assert_eq!(
        eval("b1#[true, true, true, true, true, true, true, true, true]"),
        Value::Bytes(Rc::from(vec![0xFFu8, 0x80]))
    );
}

#[test]
fn byte_range_is_checked() {
    let (status, _) = eval_err("u8#[300]");
    assert_eq!(status, 500);
}

// === Comments ===

#[test]
fn comments_are_discarded() {
    assert_eq!(eval("-- leading comment\n1 + 1 -- trailing"), Value::Int(2));
    assert_eq!(eval("{-- block {-- nested --} comment --} 3"), Value::Int(3));
}
