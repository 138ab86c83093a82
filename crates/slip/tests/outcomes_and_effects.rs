//! Structured outcomes and the side-effect queue.

use slip::{ExecutionStatus, Interpreter, Value};

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

// === Responses ===

#[test]
fn responses_are_data() {
    let interp = Interpreter::new();
    interp.execute("r: response `ok 42");
    assert_eq!(interp.execute("r.value").value, Value::Int(42));
    let status = interp.execute("r.status").value;
    assert_eq!(status.to_string(), "`ok");
}

#[test]
fn non_return_responses_propagate_as_values() {
    let source = "
        lookup: fn {k} [
            respond `not-found k
            'unreached'
        ]
        out: lookup 'x'
        out.status
    ";
    assert_eq!(eval(source).to_string(), "`not-found");
}

#[test]
fn return_is_sugar_for_respond_return() {
    assert_eq!(eval("f: fn {} [ return 7\n99 ]\ncall f"), Value::Int(7));
}

#[test]
fn top_level_return_sets_the_return_status() {
    let interp = Interpreter::new();
    let result = interp.execute("return 5\n'unreached'");
    assert_eq!(result.status, ExecutionStatus::Return);
    assert_eq!(result.value, Value::Int(5));
}

// === Emit and the queue ===

#[test]
fn emit_appends_in_order_and_never_blocks_flow() {
    let interp = Interpreter::new();
    let result = interp.execute("emit 'a' 1\nemit #['b', 'c'] 2\n'done'");
    assert_eq!(result.value, Value::str("done"));
    assert_eq!(result.side_effects.len(), 2);
    assert_eq!(result.side_effects[0].topics, vec!["a".to_owned()]);
    assert_eq!(result.side_effects[0].message, Value::Int(1));
    assert_eq!(
        result.side_effects[1].topics,
        vec!["b".to_owned(), "c".to_owned()]
    );
}

#[test]
fn the_queue_is_monotonic_across_executes() {
    let interp = Interpreter::new();
    interp.execute("emit 'one' 1");
    interp.execute("emit 'two' 2");
    let all = interp.side_effects();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].topics, vec!["one".to_owned()]);
    assert_eq!(all[1].topics, vec!["two".to_owned()]);
}

// === with-log / do ===

#[test]
fn with_log_captures_outcome_and_effects() {
    let interp = Interpreter::new();
    let setup = "
        log: with-log [
            emit 'debug' 'x'
            10 + 20
        ]
    ";
    assert!(interp.execute(setup).is_success());
    let outcome = interp.execute("log.outcome").value;
    let Value::Response(resp) = &outcome else {
        panic!("expected a response, got {outcome}");
    };
    assert_eq!(resp.status_text(), "ok");
    assert_eq!(*resp.value(), Value::Int(30));

    assert_eq!(interp.execute("len log.effects").value, Value::Int(1));
    let first = interp.execute("log.effects[0]").value;
    let Value::Dict(entry) = &first else {
        panic!("expected a dict");
    };
    assert_eq!(
        entry.borrow().get("message"),
        Some(&Value::str("x"))
    );
}

#[test]
fn do_converts_runtime_errors_to_err_responses() {
    let interp = Interpreter::new();
    let setup = "
        log: do [
            emit 'pre' 1
            1 / 0
        ]
    ";
    assert!(interp.execute(setup).is_success(), "error is captured, not fatal");
    let outcome = interp.execute("log.outcome").value;
    let Value::Response(resp) = &outcome else {
        panic!("expected a response");
    };
    assert_eq!(resp.status_text(), "err");
    assert!(resp.value().to_string().contains("division by zero"));
    // effects emitted before the error stay in the snapshot and the queue
    assert_eq!(interp.execute("len log.effects").value, Value::Int(1));
    assert_eq!(interp.side_effects().len(), 1);
}

#[test]
fn do_keeps_non_return_responses_as_is() {
    let source = "
        log: do [ response `not-found 'k' ]
        log.outcome.status
    ";
    assert_eq!(eval(source).to_string(), "`not-found");
}

#[test]
fn do_wraps_plain_values_in_ok() {
    let source = "
        log: do [ 11 ]
        log.outcome.status
    ";
    assert_eq!(eval(source).to_string(), "`ok");
}

#[test]
fn path_errors_unwind_to_do() {
    let source = "
        log: do [ missing-name ]
        log.outcome.status
    ";
    assert_eq!(eval(source).to_string(), "`err");
}

#[test]
fn effects_inside_failed_scripts_survive() {
    let interp = Interpreter::new();
    let result = interp.execute("emit 'before' 1\n1 / 0");
    assert_eq!(result.error_status, Some(500));
    assert_eq!(result.side_effects.len(), 1);
}
