//! Host-bridge builtins: import, the host-object gateway, time and print.

use crate::{
    error::{RunError, RunResult},
    interp::Evaluator,
    value::Value,
};

use super::{between, exactly};

/// `import `path` - executes a module once in a fresh scope and caches it
/// by canonical path.
pub(super) async fn import(ev: &Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [target] = exactly("import", args)?;
    let Value::PathLiteral(path) = &target else {
        return Err(RunError::type_error("import requires a path literal"));
    };
    ev.import_module(path).await
}

/// `host-object id` - the global gateway; none when the id is unknown.
pub(super) fn host_object(ev: &Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let [id] = exactly("host-object", args)?;
    let key = match &id {
        Value::Str(s) | Value::IStr(s) => s.to_string(),
        Value::PathLiteral(path) => path.canonical(),
        other => {
            return Err(RunError::type_error(format!(
                "host-object id must be a string, found {}",
                other.type_name()
            )));
        }
    };
    match ev.machine.host_objects.borrow().get(&key) {
        Some(host) => Ok(Value::HostObject(host.clone())),
        None => Ok(Value::None),
    }
}

/// `time` - seconds since the Unix epoch from the host clock.
pub(super) fn time(ev: &Evaluator, args: Vec<Value>) -> RunResult<Value> {
    between("time", args, 0, 0)?;
    Ok(Value::Float(ev.machine.clock.borrow().now()))
}

/// `print values...` - writes the display form through the host's print
/// writer.
pub(super) fn print(ev: &Evaluator, args: Vec<Value>) -> RunResult<Value> {
    let line: Vec<String> = args.iter().map(ToString::to_string).collect();
    ev.machine.print.borrow_mut().write_line(&line.join(" "));
    Ok(Value::None)
}
