//! Closures and argument binding.

use std::rc::Rc;

use crate::{
    error::{RunError, RunResult},
    scope::ScopeRef,
    signature::Sig,
    value::{Code, Value},
};

/// Metadata attached to a function: examples, guards, doc and a type tag.
///
/// `examples` seed typed-method synthesis at assignment time and double as
/// discoverable tests; `guards` are boolean code blocks evaluated at
/// dispatch time.
#[derive(Debug, Clone, Default)]
pub struct FunctionMeta {
    pub examples: Vec<Rc<Sig>>,
    pub guards: Vec<Rc<Code>>,
    pub doc: Option<String>,
    pub type_name: Option<String>,
}

/// A single concrete implementation: signature, body, defining scope.
#[derive(Debug)]
pub struct Function {
    pub sig: Rc<Sig>,
    pub body: Rc<Code>,
    pub closure: ScopeRef,
    pub meta: FunctionMeta,
}

impl Function {
    #[must_use]
    pub fn new(sig: Rc<Sig>, body: Rc<Code>, closure: ScopeRef) -> Self {
        Self {
            sig,
            body,
            closure,
            meta: FunctionMeta::default(),
        }
    }

    /// A copy of this function with one more example attached.
    #[must_use]
    pub fn with_example(&self, example: Rc<Sig>) -> Self {
        let mut meta = self.meta.clone();
        meta.examples.push(example);
        Self {
            sig: Rc::clone(&self.sig),
            body: Rc::clone(&self.body),
            closure: self.closure.clone(),
            meta,
        }
    }

    /// A copy of this function with one more guard attached.
    #[must_use]
    pub fn with_guard(&self, guard: Rc<Code>) -> Self {
        let mut meta = self.meta.clone();
        meta.guards.push(guard);
        Self {
            sig: Rc::clone(&self.sig),
            body: Rc::clone(&self.body),
            closure: self.closure.clone(),
            meta,
        }
    }

    #[must_use]
    pub fn is_guarded(&self) -> bool {
        !self.meta.guards.is_empty()
    }

    /// Binds call arguments into a fresh scope whose lexical parent is the
    /// closure scope: positional parameters in order, then the rest
    /// parameter (when declared) collecting the surplus as a list.
    pub fn bind_args(&self, args: &[Value]) -> RunResult<ScopeRef> {
        let fixed = self.sig.fixed_arity();
        if args.len() < fixed || (args.len() > fixed && !self.sig.has_rest()) {
            return Err(RunError::type_error(format!(
                "function {} takes {fixed} argument(s), got {}",
                self.sig, // sig prints the parameter list
                args.len()
            )));
        }
        let scope = ScopeRef::child_of(&self.closure);
        for (name, value) in self.sig.param_names().zip(args.iter()) {
            scope.set_own(name, value.clone());
        }
        if let Some(rest) = &self.sig.rest {
            scope.set_own(rest, Value::list(args[fixed..].to_vec()));
        }
        Ok(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Expr;

    fn sample(sig: Sig) -> Function {
        Function::new(
            Rc::new(sig),
            Rc::new(Code::new(vec![Expr::new(vec![Value::Int(1)])])),
            ScopeRef::new(),
        )
    }

    #[test]
    fn binds_positionally_into_child_of_closure() {
        let func = sample(Sig {
            positional: vec!["a".into(), "b".into()],
            ..Sig::default()
        });
        let scope = func.bind_args(&[Value::Int(1), Value::Int(2)]).unwrap();
        assert_eq!(scope.get_own("a"), Some(Value::Int(1)));
        assert_eq!(scope.get_own("b"), Some(Value::Int(2)));
        assert!(scope.lexical_parent().unwrap().same(&func.closure));
    }

    #[test]
    fn rest_collects_surplus() {
        let func = sample(Sig {
            positional: vec!["a".into()],
            rest: Some("more".into()),
            ..Sig::default()
        });
        let scope = func
            .bind_args(&[Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        assert_eq!(
            scope.get_own("more"),
            Some(Value::list(vec![Value::Int(2), Value::Int(3)]))
        );
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let func = sample(Sig {
            positional: vec!["a".into()],
            ..Sig::default()
        });
        assert!(func.bind_args(&[]).is_err());
        assert!(func.bind_args(&[Value::Int(1), Value::Int(2)]).is_err());
    }
}
