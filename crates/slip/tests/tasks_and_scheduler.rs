//! Cooperative tasks: auto-yield liveness, channels, sleep ordering and
//! cancellation.

use slip::{Interpreter, Value};

// === Channels ===

#[test]
fn main_can_rendezvous_with_a_task() {
    let interp = Interpreter::new();
    let source = "
        c: make-channel
        task [ send c 41 ]
        x: receive c
        x + 1
    ";
    let result = interp.execute(source);
    assert!(result.is_success(), "{:?}", result.error_message);
    assert_eq!(result.value, Value::Int(42));
}

#[test]
fn buffered_channels_do_not_block_within_capacity() {
    let interp = Interpreter::new();
    let source = "
        c: make-channel 2
        send c 1
        send c 2
        (receive c) + (receive c)
    ";
    assert_eq!(interp.execute(source).value, Value::Int(3));
}

#[test]
fn producer_and_consumer_make_progress() {
    let interp = Interpreter::new();
    let source = "
        c: make-channel
        task [ loop [ send c 1 ] ]
        task [
            x: receive c
            emit 'got' x
        ]
    ";
    let result = interp.execute(source);
    assert!(result.is_success(), "no deadlock: {:?}", result.error_message);
    let got: Vec<_> = result
        .side_effects
        .iter()
        .filter(|e| e.topics.contains(&"got".to_owned()))
        .collect();
    assert!(!got.is_empty(), "at least one got event is emitted");
    assert_eq!(got[0].message, Value::Int(1));
}

// === Auto-yield liveness ===

#[test]
fn an_infinite_loop_cannot_starve_other_tasks() {
    let interp = Interpreter::new();
    let source = "
        task [ while [true] [ none ] ]
        task [ emit 'alive' 1 ]
    ";
    let result = interp.execute(source);
    assert!(result.is_success(), "{:?}", result.error_message);
    assert!(
        result.side_effects.iter().any(|e| e.topics == ["alive"]),
        "the second task must run despite the busy loop"
    );
}

#[test]
fn foreach_yields_between_iterations() {
    let interp = Interpreter::new();
    let source = "
        c: make-channel
        task [ foreach `n #[1, 2, 3] [ send c n ] ]
        a: receive c
        b: receive c
        a + b
    ";
    assert_eq!(interp.execute(source).value, Value::Int(3));
}

// === Sleep ===

#[test]
fn sleep_zero_requeues_at_the_tail() {
    let interp = Interpreter::new();
    let source = "
        task [
            sleep 0
            emit 'second' 2
        ]
        task [ emit 'first' 1 ]
    ";
    let result = interp.execute(source);
    let topics: Vec<String> = result
        .side_effects
        .iter()
        .flat_map(|e| e.topics.clone())
        .collect();
    assert_eq!(topics, vec!["first".to_owned(), "second".to_owned()]);
}

#[test]
fn timed_sleep_orders_after_ready_work() {
    let interp = Interpreter::new();
    let source = "
        task [
            sleep 0.01
            emit 'slow' 1
        ]
        task [ emit 'fast' 1 ]
    ";
    let result = interp.execute(source);
    let topics: Vec<String> = result
        .side_effects
        .iter()
        .flat_map(|e| e.topics.clone())
        .collect();
    assert_eq!(topics, vec!["fast".to_owned(), "slow".to_owned()]);
}

// === Cancellation ===

#[test]
fn cancel_tasks_releases_blocked_tasks() {
    let interp = Interpreter::new();
    let source = "
        c: make-channel
        task [ receive c ]
        task [ loop [ send c (receive c) ] ]
        cancel-tasks
        'done'
    ";
    let result = interp.execute(source);
    assert!(result.is_success(), "{:?}", result.error_message);
    assert_eq!(result.value, Value::str("done"));
}

#[test]
fn tasks_return_handles_not_values() {
    let interp = Interpreter::new();
    let result = interp.execute("t: task [ 1 ]\ntype-of t");
    assert_eq!(result.value, Value::str("task"));
}

#[test]
fn deadlock_is_reported_not_hung() {
    let interp = Interpreter::new();
    let result = interp.execute("c: make-channel\nreceive c");
    assert_eq!(result.error_status, Some(500));
    assert!(result.error_message.unwrap().contains("deadlock"));
}
