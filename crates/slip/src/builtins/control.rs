//! Control-flow builtins. These consume unevaluated code blocks and run
//! them in the caller's scope; loops yield to the scheduler at the start of
//! every iteration when running inside a task.

use crate::{
    error::RunResult,
    interp::Evaluator,
    scope::ScopeRef,
    value::Value,
};

use super::{between, code_arg};

pub(super) async fn r#if(ev: &Evaluator, args: Vec<Value>, scope: &ScopeRef) -> RunResult<Value> {
    let args = between("if", args, 2, 3)?;
    let then_code = code_arg("if", &args[1])?;
    if args[0].is_truthy() {
        return ev.eval_code(&then_code, scope).await;
    }
    if let Some(else_arm) = args.get(2) {
        let else_code = code_arg("if", else_arm)?;
        return ev.eval_code(&else_code, scope).await;
    }
    Ok(Value::None)
}

pub(super) async fn r#while(
    ev: &Evaluator,
    args: Vec<Value>,
    scope: &ScopeRef,
) -> RunResult<Value> {
    let args = between("while", args, 2, 2)?;
    let cond = code_arg("while", &args[0])?;
    let body = code_arg("while", &args[1])?;
    loop {
        ev.auto_yield().await?;
        let test = ev.eval_code(&cond, scope).await?;
        let test = ev.materialize(test).await?;
        if !test.is_truthy() {
            return Ok(Value::None);
        }
        ev.eval_code(&body, scope).await?;
    }
}

pub(super) async fn foreach(
    ev: &Evaluator,
    args: Vec<Value>,
    scope: &ScopeRef,
) -> RunResult<Value> {
    let args = between("foreach", args, 3, 3)?;
    let Value::PathLiteral(binding) = &args[0] else {
        return Err(crate::error::RunError::type_error(
            "foreach requires a path literal for the loop variable",
        ));
    };
    let Some(name) = binding.simple_name() else {
        return Err(crate::error::RunError::type_error(
            "foreach binding must be a simple name",
        ));
    };
    let body = code_arg("foreach", &args[2])?;
    let items: Vec<Value> = match &args[1] {
        Value::List(list) => list.borrow().clone(),
        Value::Dict(dict) => dict
            .borrow()
            .iter()
            .map(|(k, v)| Value::list(vec![Value::str(k), v.clone()]))
            .collect(),
        other => {
            return Err(crate::error::RunError::type_error(format!(
                "foreach cannot iterate {}",
                other.type_name()
            )));
        }
    };
    for item in items {
        ev.auto_yield().await?;
        scope.set_own(name, item);
        ev.eval_code(&body, scope).await?;
    }
    Ok(Value::None)
}

pub(super) async fn r#loop(
    ev: &Evaluator,
    args: Vec<Value>,
    scope: &ScopeRef,
) -> RunResult<Value> {
    let args = between("loop", args, 1, 1)?;
    let body = code_arg("loop", &args[0])?;
    loop {
        ev.auto_yield().await?;
        ev.eval_code(&body, scope).await?;
    }
}
