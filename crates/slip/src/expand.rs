//! Inject/splice expansion.
//!
//! A single substitutional transformation that runs exactly once per code
//! value: at definition time when a `[...]` literal is produced by the
//! evaluator, or at the execution boundary when `run`/`run-with` receives
//! code built outside the evaluator. `(inject X)` evaluates `X` in the
//! expansion scope and substitutes the value as one literal node;
//! `(splice X)` replaces the node with the elements of a list (expression
//! position) or the expressions of a list/code block (statement position).
//! No user code runs beyond evaluating `X`.

use std::rc::Rc;

use async_recursion::async_recursion;

use crate::{
    error::{RunError, RunResult},
    interp::Evaluator,
    scope::ScopeRef,
    value::{Code, Expr, Value},
};

/// Marker detection: a group whose head is a bare `inject` or `splice`.
fn marker_of(expr: &Expr) -> Option<(&'static str, &[Value])> {
    let (head, rest) = expr.terms.split_first()?;
    let Value::GetPath(path) = head else {
        return None;
    };
    match path.simple_name() {
        Some("inject") => Some(("inject", rest)),
        Some("splice") => Some(("splice", rest)),
        _ => None,
    }
}

impl Evaluator {
    /// Expands a code value, returning it unchanged when already expanded.
    #[async_recursion(?Send)]
    pub(crate) async fn expand_code(
        &self,
        code: &Rc<Code>,
        scope: &ScopeRef,
    ) -> RunResult<Rc<Code>> {
        if code.expanded {
            return Ok(Rc::clone(code));
        }
        let mut exprs = Vec::with_capacity(code.exprs.len());
        for expr in &code.exprs {
            // statement-position splice: the expression is the marker alone
            if let [Value::Group(group)] = expr.terms.as_slice()
                && let Some(("splice", args)) = marker_of(group)
            {
                let spliced = self.eval_marker_arg(args, scope).await?;
                match spliced {
                    Value::List(items) => {
                        for item in items.borrow().iter() {
                            exprs.push(Expr {
                                terms: vec![item.clone()],
                                loc: expr.loc,
                            });
                        }
                    }
                    Value::Code(block) => {
                        exprs.extend(block.exprs.iter().cloned());
                    }
                    other => {
                        return Err(RunError::type_error(format!(
                            "splice in statement position requires a list or code, found {}",
                            other.type_name()
                        )));
                    }
                }
                continue;
            }
            exprs.push(self.expand_expr(expr, scope).await?);
        }
        Ok(Rc::new(Code {
            exprs,
            expanded: true,
        }))
    }

    #[async_recursion(?Send)]
    async fn expand_expr(&self, expr: &Expr, scope: &ScopeRef) -> RunResult<Expr> {
        let mut terms = Vec::with_capacity(expr.terms.len());
        for term in &expr.terms {
            match term {
                Value::Group(group) => match marker_of(group) {
                    Some(("inject", args)) => {
                        let value = self.eval_marker_arg(args, scope).await?;
                        terms.push(value);
                    }
                    Some(("splice", args)) => {
                        let value = self.eval_marker_arg(args, scope).await?;
                        let Value::List(items) = value else {
                            return Err(RunError::type_error(format!(
                                "splice in expression position requires a list, found {}",
                                value.type_name()
                            )));
                        };
                        terms.extend(items.borrow().iter().cloned());
                    }
                    _ => {
                        let inner = self.expand_expr(group, scope).await?;
                        terms.push(Value::Group(Rc::new(inner)));
                    }
                },
                Value::Code(block) => {
                    terms.push(Value::Code(self.expand_code(block, scope).await?));
                }
                Value::ListCtor(items) => {
                    let mut expanded = Vec::with_capacity(items.len());
                    for item in items.iter() {
                        // a sole-splice element contributes its values as
                        // separate list elements
                        if let [Value::Group(group)] = item.terms.as_slice()
                            && let Some(("splice", args)) = marker_of(group)
                        {
                            let value = self.eval_marker_arg(args, scope).await?;
                            let Value::List(values) = value else {
                                return Err(RunError::type_error(format!(
                                    "splice in a list literal requires a list, found {}",
                                    value.type_name()
                                )));
                            };
                            for element in values.borrow().iter() {
                                expanded.push(Expr {
                                    terms: vec![element.clone()],
                                    loc: item.loc,
                                });
                            }
                            continue;
                        }
                        expanded.push(self.expand_expr(item, scope).await?);
                    }
                    terms.push(Value::ListCtor(Rc::new(expanded)));
                }
                Value::DictCtor(entries) => {
                    let mut expanded = Vec::with_capacity(entries.len());
                    for (key, value) in entries.iter() {
                        expanded.push((key.clone(), self.expand_expr(value, scope).await?));
                    }
                    terms.push(Value::DictCtor(Rc::new(expanded)));
                }
                other => terms.push(other.clone()),
            }
        }
        Ok(Expr {
            terms,
            loc: expr.loc,
        })
    }

    async fn eval_marker_arg(&self, args: &[Value], scope: &ScopeRef) -> RunResult<Value> {
        let expr = Expr::new(args.to_vec());
        self.eval_expr_materialized(&expr, scope).await
    }
}
