//! Collection builtins.

use crate::{
    error::{RunError, RunResult},
    value::Value,
};

use super::{between, exactly};

pub(super) fn len(args: Vec<Value>) -> RunResult<Value> {
    let [value] = exactly("len", args)?;
    value
        .length()
        .map(|n| Value::Int(n as i64))
        .ok_or_else(|| {
            RunError::type_error(format!("{} has no length", value.type_name()))
        })
}

/// Shallow copy: a distinct collection that is element-equal.
pub(super) fn copy(args: Vec<Value>) -> RunResult<Value> {
    let [value] = exactly("copy", args)?;
    match &value {
        Value::List(items) => Ok(Value::list(items.borrow().clone())),
        Value::Dict(map) => Ok(Value::dict(map.borrow().clone())),
        _ => Ok(value),
    }
}

/// Deep copy with no shared interior mutability.
pub(super) fn clone(args: Vec<Value>) -> RunResult<Value> {
    let [value] = exactly("clone", args)?;
    Ok(value.deep_clone())
}

pub(super) fn push(args: Vec<Value>) -> RunResult<Value> {
    let [target, value] = exactly("push", args)?;
    let Value::List(items) = &target else {
        return Err(RunError::type_error("push requires a list"));
    };
    items.borrow_mut().push(value);
    Ok(target)
}

pub(super) fn pop(args: Vec<Value>) -> RunResult<Value> {
    let [target] = exactly("pop", args)?;
    let Value::List(items) = &target else {
        return Err(RunError::type_error("pop requires a list"));
    };
    let removed = items.borrow_mut().pop();
    removed.ok_or_else(|| RunError::runtime("pop from empty list"))
}

pub(super) fn keys(args: Vec<Value>) -> RunResult<Value> {
    let [value] = exactly("keys", args)?;
    match &value {
        Value::Dict(map) => Ok(Value::list(
            map.borrow().keys().map(Value::str).collect(),
        )),
        Value::Scope(scope) => Ok(Value::list(
            scope.data_keys().into_iter().map(|k| Value::str(&k)).collect(),
        )),
        other => Err(RunError::type_error(format!(
            "keys requires a dict or scope, found {}",
            other.type_name()
        ))),
    }
}

pub(super) fn values(args: Vec<Value>) -> RunResult<Value> {
    let [value] = exactly("values", args)?;
    match &value {
        Value::Dict(map) => Ok(Value::list(map.borrow().values().cloned().collect())),
        Value::Scope(scope) => Ok(Value::list(scope.data_values())),
        other => Err(RunError::type_error(format!(
            "values requires a dict or scope, found {}",
            other.type_name()
        ))),
    }
}

pub(super) fn contains(args: Vec<Value>) -> RunResult<Value> {
    let [haystack, needle] = exactly("contains", args)?;
    let found = match &haystack {
        Value::List(items) => items.borrow().iter().any(|v| *v == needle),
        Value::Dict(map) => needle
            .as_str()
            .is_some_and(|key| map.borrow().contains_key(key)),
        Value::Str(s) | Value::IStr(s) => {
            needle.as_str().is_some_and(|sub| s.contains(sub))
        }
        other => {
            return Err(RunError::type_error(format!(
                "contains cannot search {}",
                other.type_name()
            )));
        }
    };
    Ok(Value::Bool(found))
}

pub(super) fn range(args: Vec<Value>) -> RunResult<Value> {
    let args = between("range", args, 1, 2)?;
    let bounds: Vec<i64> = args
        .iter()
        .map(|v| match v {
            Value::Int(n) => Ok(*n),
            other => Err(RunError::type_error(format!(
                "range bounds must be ints, found {}",
                other.type_name()
            ))),
        })
        .collect::<RunResult<_>>()?;
    let (start, end) = match bounds.as_slice() {
        [end] => (0, *end),
        [start, end] => (*start, *end),
        _ => unreachable!("arity checked"),
    };
    Ok(Value::list((start..end).map(Value::Int).collect()))
}
