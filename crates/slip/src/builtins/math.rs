//! Arithmetic and comparison builtins.
//!
//! Int/Int arithmetic stays integral (checked, overflow is a runtime
//! error); mixed operands promote to float. Division of two ints yields an
//! int only when exact. `add` also concatenates strings and lists.

use std::rc::Rc;

use crate::{
    error::{RunError, RunResult},
    path::CompareOp,
    value::Value,
    view::compare_values,
};

use super::{Builtins, exactly};

fn numeric_pair(name: &str, left: &Value, right: &Value) -> RunResult<(f64, f64)> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RunError::type_error(format!(
            "{name} requires numbers, found {} and {}",
            left.type_name(),
            right.type_name()
        ))),
    }
}

pub(super) fn add(args: Vec<Value>) -> RunResult<Value> {
    let [left, right] = exactly("add", args)?;
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_add(*b)
            .map(Value::Int)
            .ok_or_else(|| RunError::runtime("integer overflow in add")),
        (Value::Str(a) | Value::IStr(a), Value::Str(b) | Value::IStr(b)) => {
            Ok(Value::Str(Rc::from(format!("{a}{b}"))))
        }
        (Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            Ok(Value::list(items))
        }
        _ => {
            let (a, b) = numeric_pair("add", &left, &right)?;
            Ok(Value::Float(a + b))
        }
    }
}

pub(super) fn sub(args: Vec<Value>) -> RunResult<Value> {
    let [left, right] = exactly("sub", args)?;
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_sub(*b)
            .map(Value::Int)
            .ok_or_else(|| RunError::runtime("integer overflow in sub")),
        _ => {
            let (a, b) = numeric_pair("sub", &left, &right)?;
            Ok(Value::Float(a - b))
        }
    }
}

pub(super) fn mul(args: Vec<Value>) -> RunResult<Value> {
    let [left, right] = exactly("mul", args)?;
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => a
            .checked_mul(*b)
            .map(Value::Int)
            .ok_or_else(|| RunError::runtime("integer overflow in mul")),
        _ => {
            let (a, b) = numeric_pair("mul", &left, &right)?;
            Ok(Value::Float(a * b))
        }
    }
}

pub(super) fn div(args: Vec<Value>) -> RunResult<Value> {
    let [left, right] = exactly("div", args)?;
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(RunError::runtime("division by zero"));
            }
            if a % b == 0 {
                Ok(Value::Int(a / b))
            } else {
                Ok(Value::Float(*a as f64 / *b as f64))
            }
        }
        _ => {
            let (a, b) = numeric_pair("div", &left, &right)?;
            if b == 0.0 {
                return Err(RunError::runtime("division by zero"));
            }
            Ok(Value::Float(a / b))
        }
    }
}

pub(super) fn modulo(args: Vec<Value>) -> RunResult<Value> {
    let [left, right] = exactly("mod", args)?;
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(RunError::runtime("modulo by zero"));
            }
            Ok(Value::Int(a.rem_euclid(*b)))
        }
        _ => {
            let (a, b) = numeric_pair("mod", &left, &right)?;
            if b == 0.0 {
                return Err(RunError::runtime("modulo by zero"));
            }
            Ok(Value::Float(a.rem_euclid(b)))
        }
    }
}

pub(super) fn pow(args: Vec<Value>) -> RunResult<Value> {
    let [left, right] = exactly("pow", args)?;
    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) if *b >= 0 => {
            let exp = u32::try_from(*b)
                .map_err(|_| RunError::runtime("exponent too large"))?;
            a.checked_pow(exp)
                .map(Value::Int)
                .ok_or_else(|| RunError::runtime("integer overflow in pow"))
        }
        _ => {
            let (a, b) = numeric_pair("pow", &left, &right)?;
            Ok(Value::Float(a.powf(b)))
        }
    }
}

pub(super) fn compare(builtin: Builtins, args: Vec<Value>) -> RunResult<Value> {
    let [left, right] = exactly("compare", args)?;
    let op = match builtin {
        Builtins::Eq => CompareOp::Eq,
        Builtins::Ne => CompareOp::Ne,
        Builtins::Lt => CompareOp::Lt,
        Builtins::Le => CompareOp::Le,
        Builtins::Gt => CompareOp::Gt,
        Builtins::Ge => CompareOp::Ge,
        other => unreachable!("not a comparison builtin: {other}"),
    };
    Ok(Value::Bool(compare_values(op, &left, &right)?))
}
