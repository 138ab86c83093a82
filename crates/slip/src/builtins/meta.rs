//! Metaprogramming builtins: run, run-with, call, parse-path.

use std::rc::Rc;

use crate::{
    error::{RunError, RunResult},
    interp::Evaluator,
    scope::ScopeRef,
    transform::path_from_text,
    value::Value,
};

use super::{between, code_arg, exactly};

/// `run code` - hermetic execution in a fresh child of the root scope;
/// writes do not leak to the caller. Code built outside the evaluator is
/// expanded here, in the caller's lexical scope.
pub(super) async fn run(
    ev: &Evaluator,
    args: Vec<Value>,
    scope: &ScopeRef,
) -> RunResult<Value> {
    let [code] = exactly("run", args)?;
    let code = code_arg("run", &code)?;
    let code = ev.expand_code(&code, scope).await?;
    let sandbox = ScopeRef::child_of(&ev.machine.root);
    ev.machine.enter_call()?;
    let result = ev.eval_code(&code, &sandbox).await;
    ev.machine.exit_call();
    result
}

/// `run-with code scope` - executes in the provided scope; a transient
/// lexical link to the caller resolves operators and names, then is
/// removed.
pub(super) async fn run_with(
    ev: &Evaluator,
    args: Vec<Value>,
    scope: &ScopeRef,
) -> RunResult<Value> {
    let [code, target] = exactly("run-with", args)?;
    let code = code_arg("run-with", &code)?;
    let Value::Scope(target) = target else {
        return Err(RunError::type_error("run-with requires a scope"));
    };
    let code = ev.expand_code(&code, scope).await?;
    let transient = target.lexical_parent().is_none();
    if transient {
        target.set_lexical_parent(Some(scope.clone()));
    }
    ev.machine.enter_call()?;
    let result = ev.eval_code(&code, &target).await;
    ev.machine.exit_call();
    if transient {
        target.set_lexical_parent(None);
    }
    result
}

/// `call target args?` - invokes a callable, resolving string and path
/// targets through the shared path grammar first.
pub(super) async fn call(
    ev: &Evaluator,
    args: Vec<Value>,
    scope: &ScopeRef,
) -> RunResult<Value> {
    let args = between("call", args, 1, 2)?;
    let call_args: Vec<Value> = match args.get(1) {
        Some(Value::List(items)) => items.borrow().clone(),
        Some(other) => vec![other.clone()],
        None => Vec::new(),
    };
    let target = match &args[0] {
        Value::Str(text) | Value::IStr(text) => {
            let path = path_from_text(text).map_err(RunError::from)?;
            ev.resolve_get_path(&path, scope).await?
        }
        Value::PathLiteral(path) => ev.resolve_get_path(path, scope).await?,
        other => other.clone(),
    };
    if target.is_callable() {
        ev.call_value(&target, call_args, scope).await
    } else if call_args.is_empty() {
        Ok(target)
    } else {
        Err(RunError::type_error(format!(
            "{} is not callable",
            target.type_name()
        )))
    }
}

/// `parse-path text` - string to path literal via the main grammar.
pub(super) fn parse_path(args: Vec<Value>) -> RunResult<Value> {
    let [text] = exactly("parse-path", args)?;
    let Some(text) = text.as_str() else {
        return Err(RunError::type_error("parse-path requires a string"));
    };
    let path = path_from_text(text).map_err(RunError::from)?;
    Ok(Value::PathLiteral(Rc::new(path)))
}
