//! Logical builtins. `logical-and` / `logical-or` short-circuit when used
//! infix - the accumulator handles that before evaluation - so the direct
//! call forms here see both operands already evaluated.

use crate::{error::RunResult, value::Value};

use super::exactly;

pub(super) fn logical_and(args: Vec<Value>) -> RunResult<Value> {
    let [left, right] = exactly("logical-and", args)?;
    Ok(if left.is_truthy() { right } else { left })
}

pub(super) fn logical_or(args: Vec<Value>) -> RunResult<Value> {
    let [left, right] = exactly("logical-or", args)?;
    Ok(if left.is_truthy() { left } else { right })
}

pub(super) fn not(args: Vec<Value>) -> RunResult<Value> {
    let [value] = exactly("not", args)?;
    Ok(Value::Bool(!value.is_truthy()))
}
