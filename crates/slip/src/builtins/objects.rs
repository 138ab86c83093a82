//! Function construction and the object model builtins.

use std::rc::Rc;

use crate::{
    error::{ErrorKind, RunError, RunResult},
    function::Function,
    scope::ScopeRef,
    value::Value,
};

use super::{between, code_arg, exactly};

/// `fn {sig} [body]` - a closure over the defining scope.
pub(super) fn r#fn(args: Vec<Value>, scope: &ScopeRef) -> RunResult<Value> {
    let [sig, body] = exactly("fn", args)?;
    let Value::Sig(sig) = sig else {
        return Err(RunError::type_error("fn requires a sig literal"));
    };
    let body = code_arg("fn", &body)?;
    Ok(Value::Function(Rc::new(Function::new(
        sig,
        body,
        scope.clone(),
    ))))
}

/// `f |example {sig}` - attaches an example to a function.
pub(super) fn example(args: Vec<Value>) -> RunResult<Value> {
    let [func, sig] = exactly("example", args)?;
    let Value::Function(func) = &func else {
        return Err(RunError::type_error("example attaches to a function"));
    };
    let Value::Sig(sig) = sig else {
        return Err(RunError::type_error("example requires a sig literal"));
    };
    Ok(Value::Function(Rc::new(func.with_example(sig))))
}

/// `f |guard [cond]` - attaches a boolean guard block.
pub(super) fn guard(args: Vec<Value>) -> RunResult<Value> {
    let [func, code] = exactly("guard", args)?;
    let Value::Function(func) = &func else {
        return Err(RunError::type_error("guard attaches to a function"));
    };
    let code = code_arg("guard", &code)?;
    Ok(Value::Function(Rc::new(func.with_guard(code))))
}

/// `scope` / `scope #{...}` - a fresh parentless scope, optionally seeded
/// with initial fields. The usual way to start a prototype.
pub(super) fn scope(args: Vec<Value>) -> RunResult<Value> {
    let args = between("scope", args, 0, 1)?;
    let fresh = ScopeRef::new();
    if let Some(init) = args.first() {
        let Value::Dict(fields) = init else {
            return Err(RunError::type_error("scope initial fields must be a dict"));
        };
        for (key, value) in fields.borrow().iter() {
            fresh.set_own(key, value.clone());
        }
    }
    Ok(Value::Scope(fresh))
}

/// `create Proto` / `create Proto #{...}` - a fresh instance with the
/// prototype as parent and optional initial fields.
pub(super) fn create(args: Vec<Value>) -> RunResult<Value> {
    let args = between("create", args, 1, 2)?;
    let Value::Scope(proto) = &args[0] else {
        return Err(RunError::type_error("create requires a scope prototype"));
    };
    let instance = ScopeRef::new();
    if !instance.set_proto_parent(proto.clone()) {
        unreachable!("fresh scope has no parent");
    }
    if let Some(init) = args.get(1) {
        let Value::Dict(fields) = init else {
            return Err(RunError::type_error(
                "create initial fields must be a dict",
            ));
        };
        for (key, value) in fields.borrow().iter() {
            instance.set_own(key, value.clone());
        }
    }
    Ok(Value::Scope(instance))
}

/// Inherit-once: setting a second parent is an inheritance error.
pub(super) fn inherit(args: Vec<Value>) -> RunResult<Value> {
    let [target, parent] = exactly("inherit", args)?;
    let (Value::Scope(target_scope), Value::Scope(parent_scope)) = (&target, &parent) else {
        return Err(RunError::type_error("inherit requires two scopes"));
    };
    if !target_scope.set_proto_parent(parent_scope.clone()) {
        return Err(RunError::new(
            ErrorKind::InheritanceError,
            "parent already set (inherit-once)",
        ));
    }
    Ok(target)
}

/// Appends mixin scopes by reference; never copies.
pub(super) fn mixin(args: Vec<Value>) -> RunResult<Value> {
    if args.len() < 2 {
        return Err(RunError::type_error(
            "mixin takes a target and at least one source",
        ));
    }
    let mut iter = args.into_iter();
    let target = iter.next().expect("arity checked");
    let Value::Scope(target_scope) = &target else {
        return Err(RunError::type_error("mixin target must be a scope"));
    };
    for source in iter {
        let Value::Scope(source_scope) = source else {
            return Err(RunError::type_error("mixin sources must be scopes"));
        };
        target_scope.push_mixin(source_scope);
    }
    Ok(target)
}

pub(super) fn type_of(args: Vec<Value>) -> RunResult<Value> {
    let [value] = exactly("type-of", args)?;
    let name = match &value {
        Value::Scope(scope) => scope
            .type_name()
            .unwrap_or_else(|| value.type_name().to_owned()),
        other => other.type_name().to_owned(),
    };
    Ok(Value::str(name))
}
