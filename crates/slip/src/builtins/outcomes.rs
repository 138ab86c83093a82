//! Outcomes and side effects: response construction, non-local exits, the
//! emit queue, and the with-log / do boundary.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    error::{RunError, RunResult},
    interp::Evaluator,
    response::Response,
    scope::ScopeRef,
    tracer::TraceEvent,
    value::Value,
};

use super::{between, code_arg, exactly};

fn status_of(value: &Value) -> RunResult<Response> {
    Err(RunError::type_error(format!(
        "response status must be a path literal or string, found {}",
        value.type_name()
    )))
}

fn build_response(status: Value, payload: Value) -> RunResult<Response> {
    match status {
        Value::PathLiteral(path) => Ok(Response::new(path, payload)),
        Value::Str(s) | Value::IStr(s) => Ok(Response::with_status(&s, payload)),
        other => status_of(&other),
    }
}

/// `response status value` - constructs an immutable outcome value.
pub(super) fn response(args: Vec<Value>) -> RunResult<Value> {
    let [status, payload] = exactly("response", args)?;
    Ok(Value::Response(Rc::new(build_response(status, payload)?)))
}

/// `respond status value?` - non-local exit carrying a response.
pub(super) fn respond(args: Vec<Value>) -> RunResult<Value> {
    let mut args = between("respond", args, 1, 2)?;
    let payload = if args.len() == 2 {
        args.pop().expect("arity checked")
    } else {
        Value::None
    };
    let status = args.pop().expect("arity checked");
    Err(RunError::Respond(build_response(status, payload)?))
}

/// `return value?` - sugar for `respond `return value`.
pub(super) fn r#return(args: Vec<Value>) -> RunResult<Value> {
    let mut args = between("return", args, 0, 1)?;
    let payload = args.pop().unwrap_or(Value::None);
    Err(RunError::Respond(Response::returned(payload)))
}

/// `emit topics message` - appends to the ordered side-effect queue.
/// Never affects control flow.
pub(super) fn emit(ev: &Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [topics, message] = exactly("emit", args)?;
    let topics = match &topics {
        Value::Str(s) | Value::IStr(s) => vec![s.to_string()],
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.borrow().len());
            for item in items.borrow().iter() {
                let Some(topic) = item.as_str() else {
                    return Err(RunError::type_error("emit topics must be strings"));
                };
                out.push(topic.to_owned());
            }
            out
        }
        other => {
            return Err(RunError::type_error(format!(
                "emit topics must be a string or list, found {}",
                other.type_name()
            )));
        }
    };
    ev.machine.trace(TraceEvent::Emit {
        topics: topics.clone(),
    });
    ev.machine.effects.borrow_mut().emit(topics, message);
    Ok(Value::None)
}

/// Normalizes a block outcome per the with-log contract.
fn normalize(result: RunResult<Value>) -> RunResult<Response> {
    let value = match result {
        Ok(value) => value,
        Err(RunError::Respond(resp)) => Value::Response(Rc::new(resp)),
        Err(RunError::Error(error)) => return Ok(Response::err(error.message())),
        Err(other) => return Err(other),
    };
    Ok(match value {
        Value::Response(resp) if resp.is_return() => match resp.value() {
            Value::Response(inner) => (**inner).clone(),
            other => Response::ok(other.clone()),
        },
        Value::Response(resp) => (*resp).clone(),
        other => Response::ok(other),
    })
}

/// `with-log [code]` / `do [code]` - runs the block, converts the result
/// or error into a response, and snapshots the side effects the block
/// produced. Events stay in the global queue.
pub(super) async fn with_log(
    ev: &Evaluator,
    args: Vec<Value>,
    scope: &ScopeRef,
) -> RunResult<Value> {
    let [code] = exactly("with-log", args)?;
    let code = code_arg("with-log", &code)?;
    let start = ev.machine.effects.borrow().len();
    let result = match ev.eval_code(&code, scope).await {
        Ok(value) => ev.materialize(value).await,
        err => err,
    };
    let outcome = normalize(result)?;
    let effects: Vec<Value> = ev
        .machine
        .effects
        .borrow()
        .since(start)
        .into_iter()
        .map(|effect| {
            let mut entry = IndexMap::new();
            entry.insert(
                "topics".to_owned(),
                Value::list(effect.topics.iter().map(Value::str).collect()),
            );
            entry.insert("message".to_owned(), effect.message);
            Value::dict(entry)
        })
        .collect();
    let mut out = IndexMap::new();
    out.insert("outcome".to_owned(), Value::Response(Rc::new(outcome)));
    out.insert("effects".to_owned(), Value::list(effects));
    Ok(Value::dict(out))
}
