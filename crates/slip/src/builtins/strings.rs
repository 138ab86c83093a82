//! String builtins.

use crate::{
    error::{RunError, RunResult},
    value::{self, Value},
};

use super::exactly;

pub(super) fn join(args: Vec<Value>) -> RunResult<Value> {
    let [list, separator] = exactly("join", args)?;
    let Value::List(items) = &list else {
        return Err(RunError::type_error("join requires a list"));
    };
    let Some(sep) = separator.as_str() else {
        return Err(RunError::type_error("join separator must be a string"));
    };
    let parts: Vec<String> = items.borrow().iter().map(ToString::to_string).collect();
    Ok(Value::str(parts.join(sep)))
}

pub(super) fn split(args: Vec<Value>) -> RunResult<Value> {
    let [text, separator] = exactly("split", args)?;
    let (Some(s), Some(sep)) = (text.as_str(), separator.as_str()) else {
        return Err(RunError::type_error("split requires two strings"));
    };
    Ok(Value::list(s.split(sep).map(Value::str).collect()))
}

pub(super) fn dedent(args: Vec<Value>) -> RunResult<Value> {
    let [text] = exactly("dedent", args)?;
    let Some(s) = text.as_str() else {
        return Err(RunError::type_error("dedent requires a string"));
    };
    Ok(Value::str(value::dedent(s)))
}
