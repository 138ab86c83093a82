//! run / run-with and inject / splice expansion.

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

// === run ===

#[test]
fn run_executes_hermetically() {
    let interp = Interpreter::new();
    assert_eq!(interp.execute("run [ 1 + 2 ]").value, Value::Int(3));
    // writes stay in the sandbox
    interp.execute("run [ leaky: 1 ]");
    assert_eq!(interp.execute("leaky").error_status, Some(404));
}

#[test]
fn empty_code_runs_to_none() {
    assert_eq!(eval("run []"), Value::None);
}

#[test]
fn run_with_writes_into_the_target_scope() {
    let source = "
        obj: scope
        run-with [ hp: 10 + 5 ] obj
        obj.hp
    ";
    assert_eq!(eval(source), Value::Int(15));
}

#[test]
fn run_with_removes_the_transient_link() {
    let interp = Interpreter::new();
    interp.execute("obj: scope\nsecret: 9");
    // during run-with the caller chain resolves `secret`
    assert_eq!(
        interp.execute("run-with [ grabbed: secret ] obj\nobj.grabbed").value,
        Value::Int(9)
    );
    // afterwards the scope is detached again: lexical reads fail
    let result = interp.execute("run-with [ secret ] obj");
    assert!(result.is_success(), "{:?}", result.error_message);
    let detached = interp.execute("run-with [ missing-now ] obj");
    assert_eq!(detached.error_status, Some(404));
}

// === inject ===

#[test]
fn inject_substitutes_at_definition_time() {
    let source = "
        x: 42
        code: [ (inject x) + 1 ]
        x: 0
        run code
    ";
    assert_eq!(eval(source), Value::Int(43));
}

#[test]
fn expansion_is_idempotent() {
    let source = "
        x: 1
        code: [ (inject x) ]
        x: 2
        first: run code
        second: run code
        #[first, second]
    ";
    assert_eq!(
        eval(source),
        Value::list(vec![Value::Int(1), Value::Int(1)])
    );
}

// === splice ===

#[test]
fn splice_expands_list_elements() {
    let source = "
        parts: #[2, 3]
        make: [ #[1, (splice parts), 4] ]
        xs: run make
        len xs
    ";
    assert_eq!(eval(source), Value::Int(4));
}

#[test]
fn statement_splice_inlines_code_blocks() {
    let interp = Interpreter::new();
    let source = "
        body: [ emit 'a' 1 ]
        prog: [
            (splice body)
            emit 'b' 2
        ]
        run prog
    ";
    let result = interp.execute(source);
    assert!(result.is_success(), "{:?}", result.error_message);
    let topics: Vec<String> = result
        .side_effects
        .iter()
        .flat_map(|e| e.topics.clone())
        .collect();
    assert_eq!(topics, vec!["a".to_owned(), "b".to_owned()]);
}

#[test]
fn splice_requires_a_list_in_expression_position() {
    let interp = Interpreter::new();
    let result = interp.execute("bad: [ len (splice 5) ]");
    assert_eq!(result.error_status, Some(500));
}

#[test]
fn markers_outside_code_literals_are_errors() {
    let interp = Interpreter::new();
    let result = interp.execute("inject 5");
    assert_eq!(result.error_status, Some(500));
}

// === reflection ===

#[test]
fn parse_path_uses_the_main_grammar() {
    let interp = Interpreter::new();
    interp.execute("user: #{ name: 'ada' }");
    assert_eq!(interp.execute("call 'user.name'").value, Value::str("ada"));
    let lit = interp.execute("parse-path 'user.name'").value;
    assert_eq!(lit.to_string(), "`user.name");
}

#[test]
fn call_invokes_callables_with_an_argument_list() {
    let source = "
        sum2: fn {a, b} [ a + b ]
        call sum2 #[40, 2]
    ";
    assert_eq!(eval(source), Value::Int(42));
}
