//! Task and channel builtins.

use std::{rc::Rc, time::Duration};

use crate::{
    error::{RunError, RunResult},
    interp::Evaluator,
    scheduler,
    scope::ScopeRef,
    tracer::TraceEvent,
    value::Value,
};

use super::{between, code_arg, exactly};

/// `task [code]` - schedules a new task from the code, the current scope
/// and the host-object context. Returns an opaque handle; nothing runs
/// synchronously.
pub(super) fn task(ev: &Evaluator, args: Vec<Value>, scope: &ScopeRef) -> RunResult<Value> {
    let [code] = exactly("task", args)?;
    let code = code_arg("task", &code)?;
    let body_scope = ScopeRef::child_of(scope);
    let task_ev = ev.task_context();
    let host = ev.machine.host_context.borrow().clone();
    let future = Box::pin(async move {
        match task_ev.eval_code(&code, &body_scope).await {
            Ok(value) => Ok(value),
            // a `return` unwinds to the task boundary and becomes the
            // task's value
            Err(RunError::Respond(resp)) => {
                if resp.is_return() {
                    Ok(resp.into_value())
                } else {
                    Ok(Value::Response(Rc::new(resp)))
                }
            }
            Err(other) => Err(other),
        }
    });
    let handle = ev.machine.sched.spawn(future, host);
    ev.machine.trace(TraceEvent::TaskSpawned { task: handle.id() });
    Ok(Value::Task(handle))
}

/// `sleep n` - suspends the current task for n seconds; zero requeues at
/// the ready-queue tail.
pub(super) async fn sleep(ev: &Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [amount] = exactly("sleep", args)?;
    let Some(seconds) = amount.as_number() else {
        return Err(RunError::type_error("sleep requires a number of seconds"));
    };
    let duration = if seconds <= 0.0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(seconds)
    };
    ev.machine.sched.sleep(duration).await?;
    Ok(Value::None)
}

/// `make-channel capacity?` - capacity 0 (the default) is a rendezvous.
pub(super) fn make_channel(args: Vec<Value>) -> RunResult<Value> {
    let args = between("make-channel", args, 0, 1)?;
    let capacity = match args.first() {
        Some(Value::Int(n)) if *n >= 0 => *n as usize,
        Some(other) => {
            return Err(RunError::type_error(format!(
                "channel capacity must be a non-negative int, found {other}"
            )));
        }
        None => 0,
    };
    Ok(Value::Channel(scheduler::make_channel(capacity)))
}

/// `send channel value` - suspends until the value is accepted.
pub(super) async fn send(ev: &Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [channel, value] = exactly("send", args)?;
    let Value::Channel(channel) = channel else {
        return Err(RunError::type_error("send requires a channel"));
    };
    ev.machine.sched.send(channel, value).await?;
    Ok(Value::None)
}

/// `receive channel` - suspends until a value arrives.
pub(super) async fn receive(ev: &Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [channel] = exactly("receive", args)?;
    let Value::Channel(channel) = channel else {
        return Err(RunError::type_error("receive requires a channel"));
    };
    ev.machine.sched.receive(channel).await
}

/// `cancel-tasks` - cancels every task registered to the current host
/// context, or all tasks when the interpreter has none.
pub(super) fn cancel_tasks(ev: &Evaluator, args: Vec<Value>) -> RunResult<Value> {
    between("cancel-tasks", args, 0, 0)?;
    let host = ev.machine.host_context.borrow().clone();
    match host {
        Some(host) => ev.machine.sched.cancel_host(&host),
        None => ev.machine.sched.cancel_all(),
    }
    Ok(Value::None)
}
