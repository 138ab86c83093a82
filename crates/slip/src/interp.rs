//! Evaluator core.
//!
//! Strict left-to-right evaluation under the accumulator model: each
//! expression is a sequence of terms; the first term seeds the accumulator,
//! and every following term must be a piped path (or an infix operator
//! alias resolving to one) that combines the accumulator with the next
//! term. A callable head collects the following terms as call arguments.
//! `logical-and` / `logical-or` short-circuit and are the only special-form
//! exceptions.
//!
//! The evaluator is async so cooperative tasks can suspend anywhere inside
//! an expression (sleep, channel operations, loop auto-yield). All
//! interpreter-wide state lives in [`Machine`], shared by every task of one
//! interpreter instance.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;
use async_recursion::async_recursion;
use indexmap::IndexMap;

use crate::{
    builtins::{self, Builtins},
    capability::{Clock, HostRef, ModuleSource, SchemeHandler, SchemeOp, SystemClock,
        SimpleTemplateEngine, TemplateEngine},
    dispatch::{self, GenericFunction},
    effects::EffectQueue,
    error::{ErrorKind, RunError, RunResult},
    function::Function,
    io::{PrintWriter, StdPrint},
    path::{MultiSetPath, Path, QueryNode, Segment},
    registry::TypeRegistry,
    resource::{NoLimitTracker, ResourceTracker},
    scheduler::Scheduler,
    scope::ScopeRef,
    signature::{Sig, SigSpec},
    tracer::{EvalTracer, NoopTracer, TraceEvent},
    value::{BytesCtor, BytesTag, Code, Expr, Value, value_to_json},
    view::{Location, View},
};

/// Interpreter-wide shared state: one per interpreter instance, shared by
/// the main script and every spawned task.
pub(crate) struct Machine {
    pub root: ScopeRef,
    pub registry: RefCell<TypeRegistry>,
    pub effects: RefCell<EffectQueue>,
    pub sched: Scheduler,
    pub resources: RefCell<Box<dyn ResourceTracker>>,
    pub tracer: RefCell<Box<dyn EvalTracer>>,
    pub print: RefCell<Box<dyn PrintWriter>>,
    pub template: RefCell<Box<dyn TemplateEngine>>,
    pub clock: RefCell<Box<dyn Clock>>,
    pub schemes: RefCell<AHashMap<String, Rc<dyn SchemeHandler>>>,
    pub module_source: RefCell<Option<Rc<dyn ModuleSource>>>,
    pub modules: RefCell<IndexMap<String, ScopeRef>>,
    pub host_objects: RefCell<AHashMap<String, HostRef>>,
    /// The host object the interpreter is attached to, if any; tasks
    /// spawned in this context register for `cancel-tasks`.
    pub host_context: RefCell<Option<String>>,
}

impl Machine {
    pub fn new() -> Self {
        let root = ScopeRef::new();
        builtins::install(&root);
        Self {
            root,
            registry: RefCell::new(TypeRegistry::new()),
            effects: RefCell::new(EffectQueue::new()),
            sched: Scheduler::new(),
            resources: RefCell::new(Box::new(NoLimitTracker)),
            tracer: RefCell::new(Box::new(NoopTracer)),
            print: RefCell::new(Box::new(StdPrint)),
            template: RefCell::new(Box::new(SimpleTemplateEngine)),
            clock: RefCell::new(Box::new(SystemClock)),
            schemes: RefCell::new(AHashMap::new()),
            module_source: RefCell::new(None),
            modules: RefCell::new(IndexMap::new()),
            host_objects: RefCell::new(AHashMap::new()),
            host_context: RefCell::new(None),
        }
    }

    pub fn track_op(&self) -> RunResult<()> {
        self.resources.borrow_mut().track_op().map_err(Into::into)
    }

    pub fn enter_call(&self) -> RunResult<()> {
        self.resources.borrow_mut().enter_call().map_err(Into::into)
    }

    pub fn exit_call(&self) {
        self.resources.borrow_mut().exit_call();
    }

    pub fn trace(&self, event: TraceEvent) {
        self.tracer.borrow_mut().trace(event);
    }
}

/// Per-task evaluation context. Cheap to clone; all heavy state is in the
/// shared [`Machine`].
#[derive(Clone)]
pub(crate) struct Evaluator {
    pub machine: Rc<Machine>,
    /// Loop auto-yield is mandatory inside task bodies only.
    pub in_task_context: bool,
    /// The item under test inside a filter predicate (`.field` paths).
    item: Option<Value>,
}

impl Evaluator {
    pub fn new(machine: Rc<Machine>) -> Self {
        Self {
            machine,
            in_task_context: false,
            item: None,
        }
    }

    /// The evaluator for a task body: same machine, auto-yield on.
    pub fn task_context(&self) -> Self {
        Self {
            machine: Rc::clone(&self.machine),
            in_task_context: true,
            item: None,
        }
    }

    pub(crate) fn with_item(&self, item: Value) -> Self {
        Self {
            machine: Rc::clone(&self.machine),
            in_task_context: self.in_task_context,
            item: Some(item),
        }
    }

    /// Mandatory loop-iteration yield: inside task context this requeues
    /// the task (and observes cancellation); top-level loops run straight
    /// through.
    pub(crate) async fn auto_yield(&self) -> RunResult<()> {
        self.machine.track_op()?;
        if self.in_task_context {
            self.machine.sched.yield_now().await?;
        }
        Ok(())
    }

    // --- expression evaluation ---

    /// Evaluates a block: the value of the last expression, or none when
    /// empty.
    #[async_recursion(?Send)]
    pub(crate) async fn eval_code(&self, code: &Code, scope: &ScopeRef) -> RunResult<Value> {
        let mut last = Value::None;
        for expr in &code.exprs {
            last = self.eval_expr(expr, scope).await?;
        }
        Ok(last)
    }

    #[async_recursion(?Send)]
    pub(crate) async fn eval_expr(&self, expr: &Expr, scope: &ScopeRef) -> RunResult<Value> {
        self.machine.trace(TraceEvent::Expr { loc: expr.loc });
        let result = match expr.terms.first() {
            Some(Value::SetPath(path)) => {
                self.eval_set_path(path, &expr.terms[1..], scope).await
            }
            Some(Value::MultiSetPath(multi)) => {
                self.eval_multi_set(multi, &expr.terms[1..], scope).await
            }
            Some(Value::DelPath(path)) => self.eval_del_path(path, scope).await,
            Some(Value::PostPath(path)) => {
                self.eval_post_path(path, &expr.terms[1..], scope).await
            }
            _ => self.eval_accumulator(&expr.terms, scope, None).await,
        };
        result.map_err(|e| e.or_location(expr.loc))
    }

    pub(crate) async fn eval_expr_materialized(
        &self,
        expr: &Expr,
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        let value = self.eval_expr(expr, scope).await?;
        self.materialize(value).await
    }

    /// The accumulator loop. `seed` pre-fills the accumulator for update
    /// assignments (`counter: + 1`).
    #[async_recursion(?Send)]
    pub(crate) async fn eval_accumulator(
        &self,
        terms: &[Value],
        scope: &ScopeRef,
        seed: Option<Value>,
    ) -> RunResult<Value> {
        self.machine.track_op()?;
        let mut acc = seed;
        let mut index = 0;
        while index < terms.len() {
            let term = &terms[index];
            let Some(current) = acc.take() else {
                // head position
                let from_path = matches!(term, Value::GetPath(_) | Value::Group(_));
                let head = self.eval_term(term, scope).await?;
                if from_path && head.is_callable() {
                    let mut args = Vec::new();
                    let mut next = index + 1;
                    while next < terms.len() && self.piped_alias(&terms[next], scope).is_none() {
                        args.push(self.eval_term_materialized(&terms[next], scope).await?);
                        next += 1;
                    }
                    if args.is_empty() && !callable_bare(&head) {
                        acc = Some(head);
                        index += 1;
                    } else {
                        acc = Some(self.call_value(&head, args, scope).await?);
                        index = next;
                    }
                } else {
                    acc = Some(head);
                    index += 1;
                }
                continue;
            };
            // accumulator occupied: the term must be a pipe
            let Some(pipe) = self.piped_alias(term, scope) else {
                return Err(RunError::runtime("unexpected value after value"));
            };
            let target = self.resolve_get_path(&pipe, scope).await?;
            if matches!(target, Value::PipedPath(_)) {
                return Err(RunError::runtime(format!("double pipe at `{pipe}`")));
            }
            // short-circuit logical forms skip evaluation of the next term
            if let Value::Builtin(b @ (Builtins::LogicalAnd | Builtins::LogicalOr)) = target {
                let left = self.materialize(current).await?;
                let evaluate_rhs = match b {
                    Builtins::LogicalAnd => left.is_truthy(),
                    _ => !left.is_truthy(),
                };
                if index + 1 < terms.len() {
                    if evaluate_rhs {
                        acc = Some(self.eval_term_materialized(&terms[index + 1], scope).await?);
                    } else {
                        acc = Some(left);
                    }
                    index += 2;
                } else {
                    acc = Some(left);
                    index += 1;
                }
                continue;
            }
            let left = self.materialize(current).await?;
            if index + 1 < terms.len() {
                let right = self.eval_term_materialized(&terms[index + 1], scope).await?;
                acc = Some(self.call_value(&target, vec![left, right], scope).await?);
                index += 2;
            } else {
                acc = Some(self.call_value(&target, vec![left], scope).await?);
                index += 1;
            }
        }
        Ok(acc.unwrap_or(Value::None))
    }

    /// A piped term: a piped-path literal, or a simple-name get-path whose
    /// binding is a piped path (the infix operator alias).
    fn piped_alias(&self, term: &Value, scope: &ScopeRef) -> Option<Rc<Path>> {
        match term {
            Value::PipedPath(path) => Some(Rc::clone(path)),
            Value::GetPath(path) => {
                let name = path.simple_name()?;
                match scope.lookup(name) {
                    Some(Value::PipedPath(inner)) => Some(inner),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    #[async_recursion(?Send)]
    pub(crate) async fn eval_term(&self, term: &Value, scope: &ScopeRef) -> RunResult<Value> {
        match term {
            Value::IStr(text) => self.render_istring(text, scope).await,
            Value::Code(code) => {
                // definition-time expansion, once per literal
                let expanded = self.expand_code(code, scope).await?;
                Ok(Value::Code(expanded))
            }
            Value::Group(expr) => self.eval_expr(expr, scope).await,
            Value::ListCtor(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items.iter() {
                    values.push(self.eval_expr_materialized(item, scope).await?);
                }
                Ok(Value::list(values))
            }
            Value::DictCtor(entries) => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key, value) in entries.iter() {
                    map.insert(key.clone(), self.eval_expr_materialized(value, scope).await?);
                }
                Ok(Value::dict(map))
            }
            Value::BytesCtor(ctor) => self.encode_bytes(ctor, scope).await,
            Value::GetPath(path) => self.resolve_get_path(path, scope).await,
            Value::SetPath(_) | Value::MultiSetPath(_) => Err(RunError::type_error(
                "set path is only allowed at the start of an expression",
            )),
            other => Ok(other.clone()),
        }
    }

    pub(crate) async fn eval_term_materialized(
        &self,
        term: &Value,
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        let value = self.eval_term(term, scope).await?;
        self.materialize(value).await
    }

    /// Views become concrete at materialization contexts.
    pub(crate) async fn materialize(&self, value: Value) -> RunResult<Value> {
        match value {
            Value::View(view) => self.resolve_view(&view).await,
            other => Ok(other),
        }
    }

    pub(crate) async fn render_istring(&self, text: &str, scope: &ScopeRef) -> RunResult<Value> {
        let rendered = self
            .machine
            .template
            .borrow()
            .render(text, scope)
            .map_err(RunError::from)?;
        Ok(Value::IStr(Rc::from(rendered)))
    }

    // --- calls and dispatch ---

    #[async_recursion(?Send)]
    pub(crate) async fn call_value(
        &self,
        callee: &Value,
        args: Vec<Value>,
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        match callee {
            Value::Function(func) => {
                self.machine.trace(TraceEvent::Call {
                    name: func.sig.to_string(),
                    argc: args.len(),
                });
                self.call_function(func, &args).await
            }
            Value::Generic(generic) => self.dispatch_generic(generic, args).await,
            Value::Builtin(builtin) => {
                self.machine.trace(TraceEvent::Call {
                    name: builtin.to_string(),
                    argc: args.len(),
                });
                builtins::call_builtin(self, *builtin, args, scope).await
            }
            Value::HostFunction { object, method } => {
                object.call(method, args).map_err(RunError::from)
            }
            other => Err(RunError::type_error(format!(
                "{} is not callable",
                other.type_name()
            ))),
        }
    }

    /// Calls one concrete method: bind into a child of the closure, run the
    /// body, absorb `return` responses at this boundary.
    pub(crate) async fn call_function(
        &self,
        func: &Rc<Function>,
        args: &[Value],
    ) -> RunResult<Value> {
        let scope = func.bind_args(args)?;
        self.machine.enter_call()?;
        let result = self.eval_code(&func.body, &scope).await;
        self.machine.exit_call();
        match result {
            Ok(Value::Response(resp)) if resp.is_return() => Ok(resp.value().clone()),
            Ok(other) => Ok(other),
            Err(RunError::Respond(resp)) => {
                if resp.is_return() {
                    Ok(resp.into_value())
                } else {
                    Ok(Value::Response(Rc::new(resp)))
                }
            }
            Err(other) => Err(other),
        }
    }

    async fn dispatch_generic(
        &self,
        generic: &Rc<RefCell<GenericFunction>>,
        args: Vec<Value>,
    ) -> RunResult<Value> {
        let (name, methods) = {
            let g = generic.borrow();
            (g.name.clone(), g.methods.clone())
        };
        let order_of = |m: &Rc<Function>| {
            methods
                .iter()
                .position(|known| Rc::ptr_eq(known, m))
                .unwrap_or(usize::MAX)
        };
        for tier in dispatch::candidate_tiers(&methods, args.len()) {
            let mut survivors = Vec::new();
            for method in tier {
                if !dispatch::is_applicable(&method, &args) {
                    continue;
                }
                if self.guards_pass(&method, &args).await? {
                    survivors.push(method);
                }
            }
            if survivors.is_empty() {
                continue;
            }
            let mut scored = Vec::with_capacity(survivors.len());
            for method in survivors {
                let vector = dispatch::score_vector(&method, &args)?;
                let order = order_of(&method);
                scored.push((method, vector, order));
            }
            let winner = dispatch::pick_best(scored, &name)?;
            self.machine.trace(TraceEvent::Dispatch {
                generic: name.clone(),
                method_index: order_of(&winner),
            });
            return self.call_function(&winner, &args).await;
        }
        Err(RunError::new(
            ErrorKind::DispatchError,
            format!(
                "no matching method for `{name}` with {} argument(s); candidates: {}",
                args.len(),
                dispatch::candidate_summary(&methods)
            ),
        ))
    }

    /// All guards of a method must be truthy with the parameters bound.
    async fn guards_pass(&self, method: &Rc<Function>, args: &[Value]) -> RunResult<bool> {
        if method.meta.guards.is_empty() {
            return Ok(true);
        }
        let scope = method.bind_args(args)?;
        for guard in &method.meta.guards {
            let value = self.eval_code(guard, &scope).await?;
            let value = self.materialize(value).await?;
            if !value.is_truthy() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    // --- get-path resolution ---

    #[async_recursion(?Send)]
    pub(crate) async fn resolve_get_path(
        &self,
        path: &Path,
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        if path.scheme().is_some() {
            return self.scheme_call(SchemeOp::Read, path, None, scope).await;
        }
        if path.item_scoped {
            let Some(item) = self.item.clone() else {
                return Err(RunError::type_error(format!(
                    "`.{path}` is only valid inside a filter predicate"
                )));
            };
            let mut current = item;
            for segment in &path.segments {
                current = self.step_segment(current, segment, scope).await?;
            }
            return Ok(current);
        }
        let mut index = 0;
        let mut cursor = scope.clone();
        while let Some(segment) = path.segments.get(index) {
            match segment {
                Segment::Root => cursor = self.machine.root.clone(),
                Segment::Parent => {
                    cursor = cursor.lexical_parent().ok_or_else(|| {
                        RunError::new(ErrorKind::PathNotFound, "no parent scope")
                    })?;
                }
                _ => break,
            }
            index += 1;
        }
        let Some(first) = path.segments.get(index) else {
            return Ok(Value::Scope(cursor));
        };
        let mut current = match first {
            Segment::Name(name) => cursor
                .lookup(name)
                .ok_or_else(|| path_error(name, path))?,
            Segment::Group(expr) => self.eval_expr_materialized(expr, &cursor).await?,
            _ => {
                return Err(RunError::type_error(format!(
                    "path `{path}` cannot start with a query"
                )));
            }
        };
        for segment in &path.segments[index + 1..] {
            current = self.step_segment(current, segment, scope).await?;
        }
        Ok(current)
    }

    #[async_recursion(?Send)]
    async fn step_segment(
        &self,
        current: Value,
        segment: &Segment,
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        match segment {
            Segment::Name(name) => self.property_step(current, name).await,
            Segment::Query(node) => Ok(match current {
                Value::View(view) => Value::View(Rc::new(view.chained(node.clone()))),
                other => Value::View(Rc::new(View::new(other, node.clone(), scope.clone()))),
            }),
            Segment::Group(expr) => {
                let key = self.eval_expr_materialized(expr, scope).await?;
                let current = self.materialize(current).await?;
                self.index_value(&current, &key)
            }
            other => Err(RunError::type_error(format!(
                "misplaced path segment `{other:?}`"
            ))),
        }
    }

    /// One `Name` step over a current value: property chain on scopes, key
    /// lookup on dicts, vectorized pluck over lists.
    #[async_recursion(?Send)]
    async fn property_step(&self, current: Value, name: &str) -> RunResult<Value> {
        match current {
            Value::Scope(s) => s
                .lookup_property(name)
                .ok_or_else(|| RunError::path_not_found(name)),
            Value::Dict(d) => {
                let found = d.borrow().get(name).cloned();
                found.ok_or_else(|| RunError::path_not_found(name))
            }
            Value::List(items) => {
                // collection-wide pluck, one property lookup per element
                let elements = items.borrow().clone();
                let mut plucked = Vec::with_capacity(elements.len());
                for element in elements {
                    plucked.push(self.property_step(element, name).await?);
                }
                Ok(Value::list(plucked))
            }
            Value::View(view) => {
                let resolved = self.resolve_view(&view).await?;
                self.property_step(resolved, name).await
            }
            Value::HostObject(host) => host
                .get(name)
                .ok_or_else(|| RunError::path_not_found(name)),
            Value::Response(resp) => match name {
                "status" => Ok(Value::PathLiteral(Rc::clone(resp.status()))),
                "value" => Ok(resp.value().clone()),
                _ => Err(RunError::path_not_found(name)),
            },
            other => Err(RunError::type_error(format!(
                "cannot read property `{name}` of {}",
                other.type_name()
            ))),
        }
    }

    // --- assignment ---

    #[async_recursion(?Send)]
    pub(crate) async fn eval_set_path(
        &self,
        path: &Path,
        rest: &[Value],
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        if path.scheme().is_some() {
            let payload = self.eval_accumulator(rest, scope, None).await?;
            let payload = self.materialize(payload).await?;
            self.scheme_call(SchemeOp::Write, path, Some(payload.clone()), scope)
                .await?;
            return Ok(payload);
        }
        let target = self.resolve_set_target(path, scope).await?;
        let update = rest
            .first()
            .is_some_and(|t| self.piped_alias(t, scope).is_some());
        match target {
            SetTarget::Dynamic(value) => match value {
                Value::SetPath(p) | Value::GetPath(p) | Value::PathLiteral(p) => {
                    self.eval_set_path(&p, rest, scope).await
                }
                Value::MultiSetPath(m) => self.eval_multi_set(&m, rest, scope).await,
                Value::PostPath(p) => self.eval_post_path(&p, rest, scope).await,
                other => Err(RunError::type_error(format!(
                    "dynamic assignment target must be a path, found {}",
                    other.type_name()
                ))),
            },
            SetTarget::SliceReplace(list, lo, hi) => {
                let value = self.eval_accumulator(rest, scope, None).await?;
                let value = self.materialize(value).await?;
                let Value::List(replacement) = &value else {
                    return Err(RunError::type_error(
                        "slice replacement requires a list on the right-hand side",
                    ));
                };
                let items = replacement.borrow().clone();
                list.borrow_mut().splice(lo..hi, items);
                Ok(value)
            }
            SetTarget::Locations(locations) => {
                if update {
                    let mut written = Vec::with_capacity(locations.len());
                    for location in &locations {
                        let seed = location.read()?;
                        let value = self
                            .eval_accumulator(rest, scope, Some(seed))
                            .await?;
                        let value = self.materialize(value).await?;
                        location.write(value.clone())?;
                        written.push(value);
                    }
                    Ok(Value::list(written))
                } else {
                    let value = self.eval_accumulator(rest, scope, None).await?;
                    let value = self.materialize(value).await?;
                    if let Value::List(rhs) = &value {
                        let items = rhs.borrow().clone();
                        if items.len() != locations.len() {
                            return Err(RunError::runtime(format!(
                                "vectorized assignment length mismatch: {} location(s), {} value(s)",
                                locations.len(),
                                items.len()
                            )));
                        }
                        for (location, item) in locations.iter().zip(items) {
                            location.write(item)?;
                        }
                    } else {
                        for location in &locations {
                            location.write(value.clone())?;
                        }
                    }
                    Ok(value)
                }
            }
            single => {
                let value = if update {
                    let seed = self.read_set_target(&single, path, scope).await?;
                    self.eval_accumulator(rest, scope, Some(seed)).await?
                } else {
                    self.eval_accumulator(rest, scope, None).await?
                };
                let value = self.materialize(value).await?;
                self.christen_if_needed(&value, path);
                let value = if let Value::Function(func) = &value {
                    self.merge_function_binding(&single, path, Rc::clone(func), scope)
                        .await?
                } else {
                    value
                };
                self.write_set_target(&single, value.clone())?;
                Ok(value)
            }
        }
    }

    async fn read_set_target(
        &self,
        target: &SetTarget,
        path: &Path,
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        match target {
            // update reads resolve lexically so `counter: + 1` sees an
            // outer binding before shadowing it
            SetTarget::ScopeName(_, _) => self.resolve_get_path(path, scope).await,
            SetTarget::DictKey(dict, key) => {
                let found = dict.borrow().get(key).cloned();
                found.ok_or_else(|| RunError::path_not_found(key))
            }
            SetTarget::ListIndex(list, index) => {
                let found = list.borrow().get(*index).cloned();
                found.ok_or_else(|| RunError::runtime("index out of range"))
            }
            SetTarget::Host(host, key) => host
                .get(key)
                .ok_or_else(|| RunError::path_not_found(key)),
            _ => Err(RunError::type_error("target does not support updates")),
        }
    }

    fn write_set_target(&self, target: &SetTarget, value: Value) -> RunResult<()> {
        match target {
            SetTarget::ScopeName(scope, name) => {
                scope.set_own(name, value);
                Ok(())
            }
            SetTarget::DictKey(dict, key) => {
                dict.borrow_mut().insert(key.clone(), value);
                Ok(())
            }
            SetTarget::ListIndex(list, index) => {
                let mut items = list.borrow_mut();
                let slot = items
                    .get_mut(*index)
                    .ok_or_else(|| RunError::runtime("index out of range"))?;
                *slot = value;
                Ok(())
            }
            SetTarget::Host(host, key) => host.set(key, value).map_err(RunError::from),
            _ => Err(RunError::type_error("invalid write target")),
        }
    }

    /// Christening: the first assignment of an un-christened scope fixes
    /// its canonical name and allocates its type id.
    fn christen_if_needed(&self, value: &Value, path: &Path) {
        if let Value::Scope(scope) = value
            && scope.type_id().is_none()
        {
            let canonical = path.dotted_names();
            if canonical.is_empty() {
                return;
            }
            let id = self.machine.registry.borrow_mut().register(&canonical);
            scope.christen(canonical, id);
        }
    }

    /// Assigning a function merges it into the generic function at the
    /// path, synthesizing typed clones from examples first.
    async fn merge_function_binding(
        &self,
        target: &SetTarget,
        path: &Path,
        func: Rc<Function>,
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        let methods = self.synthesize_methods(func, scope).await?;
        let existing = match target {
            SetTarget::ScopeName(owner, name) => owner.lookup(name),
            SetTarget::DictKey(dict, key) => dict.borrow().get(key).cloned(),
            SetTarget::ListIndex(list, index) => list.borrow().get(*index).cloned(),
            _ => None,
        };
        let generic = match existing {
            Some(Value::Generic(generic)) => generic,
            _ => {
                let name = path.last_name().unwrap_or("anonymous").to_owned();
                Rc::new(RefCell::new(GenericFunction::new(name)))
            }
        };
        for method in methods {
            generic.borrow_mut().add_method(method);
        }
        Ok(Value::Generic(generic))
    }

    /// Example-driven synthesis: one typed clone per keyworded example when
    /// the function itself carries no annotations. Value-specs evaluate in
    /// the closure first, then the current scope; the inferred primitive
    /// annotation comes from the concrete value.
    async fn synthesize_methods(
        &self,
        func: Rc<Function>,
        scope: &ScopeRef,
    ) -> RunResult<Vec<Rc<Function>>> {
        if !func.sig.is_untyped() || func.meta.examples.is_empty() {
            return Ok(vec![func]);
        }
        let mut clones = Vec::new();
        'examples: for example in &func.meta.examples {
            if example.keywords.is_empty() {
                continue;
            }
            let mut keywords = Vec::with_capacity(func.sig.positional.len());
            for param in &func.sig.positional {
                let Some(spec) = example.keyword(param) else {
                    continue 'examples;
                };
                let concrete = self.example_spec_value(spec, &func.closure, scope)?;
                let inferred = dispatch::primitive_name_of(&concrete);
                keywords.push((param.clone(), SigSpec::Name(inferred.to_owned())));
            }
            let sig = Sig {
                positional: Vec::new(),
                keywords,
                rest: None,
                ret: func.sig.ret.clone(),
            };
            let mut meta = func.meta.clone();
            meta.examples = vec![Rc::clone(example)];
            clones.push(Rc::new(Function {
                sig: Rc::new(sig),
                body: Rc::clone(&func.body),
                closure: func.closure.clone(),
                meta,
            }));
        }
        if clones.is_empty() {
            Ok(vec![func])
        } else {
            Ok(clones)
        }
    }

    /// Concrete value of an example value-spec: literals as-is, paths
    /// resolved in the closure then the current scope.
    fn example_spec_value(
        &self,
        spec: &SigSpec,
        closure: &ScopeRef,
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        match spec {
            SigSpec::Literal(value) => Ok(value.clone()),
            SigSpec::Name(name) => closure
                .lookup(name)
                .or_else(|| scope.lookup(name))
                .ok_or_else(|| RunError::path_not_found(name)),
            SigSpec::Union(_) => Err(RunError::type_error(
                "example values cannot be unions",
            )),
        }
    }

    /// Resolves a set path into a concrete write target, tracking location
    /// provenance through plucks and queries.
    async fn resolve_set_target(
        &self,
        path: &Path,
        scope: &ScopeRef,
    ) -> RunResult<SetTarget> {
        let mut index = 0;
        let mut cursor = scope.clone();
        while let Some(segment) = path.segments.get(index) {
            match segment {
                Segment::Root => cursor = self.machine.root.clone(),
                Segment::Parent => {
                    cursor = cursor.lexical_parent().ok_or_else(|| {
                        RunError::new(ErrorKind::PathNotFound, "no parent scope")
                    })?;
                }
                _ => break,
            }
            index += 1;
        }
        let segments = &path.segments[index..];
        // simple binding: write to the cursor scope's own data
        if let [Segment::Name(name)] = segments {
            return Ok(SetTarget::ScopeName(cursor, name.clone()));
        }
        // dynamic target: `(expr): v` - a view routes to its locations,
        // a path value routes to the corresponding write strategy
        if let [Segment::Group(expr)] = segments {
            let value = self.eval_expr(expr, &cursor).await?;
            if let Value::View(view) = &value {
                return Ok(SetTarget::Locations(self.view_locations(view).await?));
            }
            return Ok(SetTarget::Dynamic(value));
        }
        let Some((first, middle_and_last)) = segments.split_first() else {
            return Err(RunError::type_error(format!("cannot assign to `{path}`")));
        };
        let Some((last, middle)) = middle_and_last.split_last() else {
            return Err(RunError::type_error(format!("cannot assign to `{path}`")));
        };
        let mut cur = match first {
            Segment::Name(name) => SetCursor::Val(
                cursor.lookup(name).ok_or_else(|| path_error(name, path))?,
            ),
            Segment::Group(expr) => {
                SetCursor::Val(self.eval_expr_materialized(expr, &cursor).await?)
            }
            _ => return Err(RunError::type_error(format!("cannot assign to `{path}`"))),
        };
        for segment in middle {
            cur = self.set_walk_step(cur, segment, scope).await?;
        }
        self.finish_set_target(cur, last, scope).await
    }

    async fn set_walk_step(
        &self,
        cur: SetCursor,
        segment: &Segment,
        scope: &ScopeRef,
    ) -> RunResult<SetCursor> {
        match segment {
            Segment::Name(name) => match cur {
                SetCursor::Val(Value::Scope(s)) => {
                    let value = s
                        .lookup_property(name)
                        .ok_or_else(|| RunError::path_not_found(name))?;
                    Ok(SetCursor::Val(value))
                }
                SetCursor::Val(Value::Dict(d)) => {
                    let value = d.borrow().get(name).cloned();
                    Ok(SetCursor::Val(value.ok_or_else(|| {
                        RunError::path_not_found(name)
                    })?))
                }
                SetCursor::Val(Value::List(list)) => {
                    // pluck keeps provenance: one pointer per element
                    let elements = list.borrow().clone();
                    let mut pairs = Vec::with_capacity(elements.len());
                    for element in elements {
                        pairs.push(self.property_pair(element, name)?);
                    }
                    Ok(SetCursor::Pairs(pairs))
                }
                SetCursor::Val(other) => Err(RunError::type_error(format!(
                    "cannot traverse `{name}` through {}",
                    other.type_name()
                ))),
                SetCursor::Pairs(pairs) => {
                    let mut next = Vec::with_capacity(pairs.len());
                    for (_, value) in pairs {
                        next.push(self.property_pair(value, name)?);
                    }
                    Ok(SetCursor::Pairs(next))
                }
            },
            Segment::Query(node) => {
                let pairs = match cur {
                    SetCursor::Val(value) => self.location_pairs(&value)?,
                    SetCursor::Pairs(pairs) => pairs,
                };
                Ok(SetCursor::Pairs(
                    self.narrow_pairs(pairs, node, scope).await?,
                ))
            }
            Segment::Group(expr) => {
                let key = self.eval_expr_materialized(expr, scope).await?;
                match cur {
                    SetCursor::Val(value) => Ok(SetCursor::Val(self.index_value(&value, &key)?)),
                    SetCursor::Pairs(_) => Err(RunError::type_error(
                        "group segments cannot follow a query in assignment",
                    )),
                }
            }
            other => Err(RunError::type_error(format!(
                "misplaced path segment `{other:?}` in assignment"
            ))),
        }
    }

    fn property_pair(&self, container: Value, name: &str) -> RunResult<(Location, Value)> {
        match container {
            Value::Scope(s) => {
                let value = s
                    .lookup_property(name)
                    .ok_or_else(|| RunError::path_not_found(name))?;
                Ok((Location::Scope(s, name.to_owned()), value))
            }
            Value::Dict(d) => {
                let value = d
                    .borrow()
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RunError::path_not_found(name))?;
                Ok((Location::Dict(d, name.to_owned()), value))
            }
            other => Err(RunError::type_error(format!(
                "cannot address `{name}` inside {}",
                other.type_name()
            ))),
        }
    }

    async fn finish_set_target(
        &self,
        cur: SetCursor,
        last: &Segment,
        scope: &ScopeRef,
    ) -> RunResult<SetTarget> {
        match last {
            Segment::Name(name) => match cur {
                SetCursor::Val(Value::Scope(s)) => Ok(SetTarget::ScopeName(s, name.clone())),
                SetCursor::Val(Value::Dict(d)) => Ok(SetTarget::DictKey(d, name.clone())),
                SetCursor::Val(Value::HostObject(h)) => Ok(SetTarget::Host(h, name.clone())),
                SetCursor::Val(Value::List(list)) => {
                    // columnar: one pointer per element
                    let elements = list.borrow().clone();
                    let mut locations = Vec::with_capacity(elements.len());
                    for element in elements {
                        let (location, _) = self.property_pair(element, name)?;
                        locations.push(location);
                    }
                    Ok(SetTarget::Locations(locations))
                }
                SetCursor::Val(other) => Err(RunError::type_error(format!(
                    "cannot assign `{name}` on {}",
                    other.type_name()
                ))),
                SetCursor::Pairs(pairs) => {
                    let mut locations = Vec::with_capacity(pairs.len());
                    for (_, value) in pairs {
                        let (location, _) = self.property_pair(value, name)?;
                        locations.push(location);
                    }
                    Ok(SetTarget::Locations(locations))
                }
            },
            Segment::Query(node) => {
                if let SetCursor::Val(Value::List(list)) = &cur {
                    let list = list.clone();
                    // whole-slice replacement and direct indexing on a
                    // plain list
                    match node {
                        QueryNode::Slice { start, end } => {
                            let len = list.borrow().len();
                            let (lo, hi) =
                                self.eval_slice_bounds(start, end, len, scope).await?;
                            return Ok(SetTarget::SliceReplace(list, lo, hi));
                        }
                        QueryNode::Simple(expr) => {
                            let key = self.eval_expr_materialized(expr, scope).await?;
                            let Value::Int(raw) = key else {
                                return Err(RunError::type_error("list index must be an int"));
                            };
                            let len = list.borrow().len();
                            let at = crate::view::normalize_index(raw, len).ok_or_else(|| {
                                RunError::runtime(format!("index {raw} out of range"))
                            })?;
                            return Ok(SetTarget::ListIndex(list, at));
                        }
                        QueryNode::Filter(_) => {}
                    }
                }
                if let SetCursor::Val(Value::Dict(dict)) = &cur
                    && let QueryNode::Simple(expr) = node
                {
                    let dict = dict.clone();
                    let key = self.eval_expr_materialized(expr, scope).await?;
                    let Some(name) = key.as_str() else {
                        return Err(RunError::type_error("dict key must be a string"));
                    };
                    return Ok(SetTarget::DictKey(dict, name.to_owned()));
                }
                let pairs = match cur {
                    SetCursor::Val(value) => self.location_pairs(&value)?,
                    SetCursor::Pairs(pairs) => pairs,
                };
                let narrowed = self.narrow_pairs(pairs, node, scope).await?;
                Ok(SetTarget::Locations(
                    narrowed.into_iter().map(|(loc, _)| loc).collect(),
                ))
            }
            Segment::Group(expr) => {
                let key = self.eval_expr_materialized(expr, scope).await?;
                match cur {
                    SetCursor::Val(Value::Scope(s)) => {
                        let Some(name) = key.as_str() else {
                            return Err(RunError::type_error("scope key must be a string"));
                        };
                        Ok(SetTarget::ScopeName(s, name.to_owned()))
                    }
                    SetCursor::Val(Value::Dict(d)) => {
                        let Some(name) = key.as_str() else {
                            return Err(RunError::type_error("dict key must be a string"));
                        };
                        Ok(SetTarget::DictKey(d, name.to_owned()))
                    }
                    SetCursor::Val(Value::List(list)) => {
                        let Value::Int(raw) = key else {
                            return Err(RunError::type_error("list index must be an int"));
                        };
                        let len = list.borrow().len();
                        let at = crate::view::normalize_index(raw, len).ok_or_else(|| {
                            RunError::runtime(format!("index {raw} out of range"))
                        })?;
                        Ok(SetTarget::ListIndex(list, at))
                    }
                    _ => Err(RunError::type_error("invalid dynamic assignment target")),
                }
            }
            other => Err(RunError::type_error(format!(
                "cannot assign through `{other:?}`"
            ))),
        }
    }

    /// Destructuring: the right-hand side must be a list of matching
    /// length; targets bind positionally.
    pub(crate) async fn eval_multi_set(
        &self,
        multi: &MultiSetPath,
        rest: &[Value],
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        let value = self.eval_accumulator(rest, scope, None).await?;
        let value = self.materialize(value).await?;
        let Value::List(items) = &value else {
            return Err(RunError::type_error(format!(
                "destructuring requires a list on the right-hand side, found {}",
                value.type_name()
            )));
        };
        let items = items.borrow().clone();
        if items.len() != multi.targets.len() {
            return Err(RunError::type_error(format!(
                "destructuring length mismatch: {} target(s), {} value(s)",
                multi.targets.len(),
                items.len()
            )));
        }
        for (target, item) in multi.targets.iter().zip(items) {
            let single = self.resolve_set_target(target, scope).await?;
            self.christen_if_needed(&item, target);
            self.write_set_target(&single, item)?;
        }
        Ok(value)
    }

    /// Delete: unbinds the target from its owning scope or dict, pruning
    /// intermediate scopes left empty along the walked chain.
    pub(crate) async fn eval_del_path(&self, path: &Path, scope: &ScopeRef) -> RunResult<Value> {
        if path.scheme().is_some() {
            return self.scheme_call(SchemeOp::Delete, path, None, scope).await;
        }
        let mut index = 0;
        let mut cursor = scope.clone();
        while let Some(segment) = path.segments.get(index) {
            match segment {
                Segment::Root => cursor = self.machine.root.clone(),
                Segment::Parent => {
                    cursor = cursor.lexical_parent().ok_or_else(|| {
                        RunError::new(ErrorKind::PathNotFound, "no parent scope")
                    })?;
                }
                _ => break,
            }
            index += 1;
        }
        let segments = &path.segments[index..];
        // simple unbind: the owning scope along the lexical chain
        if let [Segment::Name(name)] = segments {
            let owner = cursor
                .owner_of(name)
                .ok_or_else(|| path_error(name, path))?;
            let removed = owner
                .remove_own(name)
                .ok_or_else(|| path_error(name, path))?;
            return Ok(removed);
        }
        let Some((Segment::Name(first), rest)) = segments.split_first() else {
            return Err(RunError::type_error(format!("cannot delete `{path}`")));
        };
        let Some((last, middle)) = rest.split_last() else {
            unreachable!("single-segment handled above");
        };
        // walk to the container, remembering scope ancestry for pruning
        let owner = cursor
            .owner_of(first)
            .ok_or_else(|| path_error(first, path))?;
        let mut ancestry: Vec<(ScopeRef, String)> = vec![(owner.clone(), first.clone())];
        let mut current = owner
            .get_own(first)
            .ok_or_else(|| path_error(first, path))?;
        for segment in middle {
            match segment {
                Segment::Name(name) => {
                    let next = self.property_step(current.clone(), name).await?;
                    if let Value::Scope(container) = &current {
                        ancestry.push((container.clone(), name.clone()));
                    } else {
                        ancestry.clear();
                    }
                    current = next;
                }
                other => {
                    current = self.step_segment(current, other, scope).await?;
                    current = self.materialize(current).await?;
                    ancestry.clear();
                }
            }
        }
        let removed = match (last, &current) {
            (Segment::Name(name), Value::Scope(s)) => s
                .remove_own(name)
                .ok_or_else(|| RunError::path_not_found(name))?,
            (Segment::Name(name), Value::Dict(d)) => d
                .borrow_mut()
                .shift_remove(name)
                .ok_or_else(|| RunError::path_not_found(name))?,
            (Segment::Name(name), Value::HostObject(h)) => {
                h.delete(name).map_err(RunError::from)?;
                Value::None
            }
            (Segment::Query(QueryNode::Simple(expr)), Value::List(list)) => {
                let key = self.eval_expr_materialized(expr, scope).await?;
                let Value::Int(raw) = key else {
                    return Err(RunError::type_error("list index must be an int"));
                };
                let len = list.borrow().len();
                let at = crate::view::normalize_index(raw, len)
                    .ok_or_else(|| RunError::runtime(format!("index {raw} out of range")))?;
                list.borrow_mut().remove(at)
            }
            _ => {
                return Err(RunError::type_error(format!("cannot delete `{path}`")));
            }
        };
        // prune cascading-empty intermediate scopes, deepest first
        if let (Segment::Name(_), Value::Scope(holder)) = (last, &current) {
            let mut emptied = holder.is_empty();
            for (container, name) in ancestry.iter().rev() {
                if !emptied {
                    break;
                }
                if let Some(Value::Scope(child)) = container.get_own(name)
                    && child.is_empty()
                {
                    container.remove_own(name);
                    emptied = container.is_empty();
                } else {
                    break;
                }
            }
        }
        Ok(removed)
    }

    /// Post: a submit to a scheme handler with the remainder as body.
    pub(crate) async fn eval_post_path(
        &self,
        path: &Path,
        rest: &[Value],
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        let payload = self.eval_accumulator(rest, scope, None).await?;
        let payload = self.materialize(payload).await?;
        if path.scheme().is_some() {
            return self
                .scheme_call(SchemeOp::Post, path, Some(payload), scope)
                .await;
        }
        Err(RunError::new(
            ErrorKind::Unimplemented,
            format!("post requires a scheme handler for `{path}`"),
        ))
    }

    // --- host bridge ---

    pub(crate) async fn scheme_call(
        &self,
        op: SchemeOp,
        path: &Path,
        payload: Option<Value>,
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        let scheme = path.scheme().expect("caller checked scheme").to_owned();
        let handler = self.machine.schemes.borrow().get(&scheme).cloned();
        let Some(handler) = handler else {
            return Err(RunError::new(
                ErrorKind::Unimplemented,
                format!("no handler registered for scheme `{scheme}://`"),
            ));
        };
        let mut configuration = IndexMap::new();
        for (key, value) in &path.configuration {
            let value = self.eval_term_materialized(value, scope).await?;
            configuration.insert(key.clone(), value);
        }
        let lite = configuration.get("lite").is_some_and(Value::is_truthy);
        let full = configuration.get("full").is_some_and(Value::is_truthy);
        let payload = payload.map(|body| {
            let wants_json = configuration
                .get("content-type")
                .and_then(Value::as_str)
                .is_some_and(|ct| ct.contains("json"));
            if wants_json {
                Value::str(value_to_json(&body).to_string())
            } else {
                body
            }
        });
        match handler.handle(op, path, &configuration, payload) {
            Ok(value) => {
                if full {
                    let mut map = IndexMap::new();
                    map.insert("status".to_owned(), Value::Int(200));
                    map.insert("value".to_owned(), value);
                    map.insert("meta".to_owned(), Value::dict(IndexMap::new()));
                    Ok(Value::dict(map))
                } else if lite {
                    Ok(Value::list(vec![Value::Int(200), value]))
                } else {
                    Ok(value)
                }
            }
            Err(error) => {
                let status = i64::from(error.status());
                if full {
                    let mut map = IndexMap::new();
                    map.insert("status".to_owned(), Value::Int(status));
                    map.insert("value".to_owned(), Value::str(error.message()));
                    map.insert("meta".to_owned(), Value::dict(IndexMap::new()));
                    Ok(Value::dict(map))
                } else if lite {
                    Ok(Value::list(vec![
                        Value::Int(status),
                        Value::str(error.message()),
                    ]))
                } else {
                    Err(RunError::from(error))
                }
            }
        }
    }

    /// Module import: execute once in a fresh scope, cache by canonical
    /// path, return the cached scope thereafter.
    pub(crate) async fn import_module(&self, path: &Path) -> RunResult<Value> {
        let key = path.canonical();
        if let Some(cached) = self.machine.modules.borrow().get(&key) {
            return Ok(Value::Scope(cached.clone()));
        }
        let source_provider = self.machine.module_source.borrow().clone();
        let Some(provider) = source_provider else {
            return Err(RunError::new(
                ErrorKind::Unimplemented,
                "no module source registered for import",
            ));
        };
        let source = provider.load(path).map_err(RunError::from)?;
        let code = crate::transform::lower(&source).map_err(RunError::from)?;
        let module_scope = ScopeRef::child_of(&self.machine.root);
        self.eval_code(&code, &module_scope).await?;
        self.machine
            .modules
            .borrow_mut()
            .insert(key, module_scope.clone());
        Ok(Value::Scope(module_scope))
    }

    // --- typed byte streams ---

    pub(crate) async fn encode_bytes(
        &self,
        ctor: &BytesCtor,
        scope: &ScopeRef,
    ) -> RunResult<Value> {
        let mut values = Vec::with_capacity(ctor.items.len());
        for item in &ctor.items {
            values.push(self.eval_expr_materialized(item, scope).await?);
        }
        if ctor.tag == BytesTag::B1 {
            // MSB-first bit packing, zero-padded trailing byte
            let mut out = Vec::with_capacity(values.len().div_ceil(8));
            for chunk in values.chunks(8) {
                let mut byte = 0u8;
                for (offset, value) in chunk.iter().enumerate() {
                    if value.is_truthy() {
                        byte |= 1 << (7 - offset);
                    }
                }
                out.push(byte);
            }
            return Ok(Value::Bytes(Rc::from(out)));
        }
        let mut out = Vec::new();
        for value in &values {
            encode_numeric(ctor.tag, value, &mut out)?;
        }
        Ok(Value::Bytes(Rc::from(out)))
    }
}

/// Head-position callables invoked with zero arguments when referenced
/// bare: builtins whose minimum arity is zero, and host methods (which are
/// command-like).
fn callable_bare(value: &Value) -> bool {
    match value {
        Value::Builtin(b) => b.bare_callable(),
        Value::HostFunction { .. } => true,
        _ => false,
    }
}

fn path_error(name: &str, path: &Path) -> RunError {
    RunError::new(
        ErrorKind::PathNotFound,
        format!("`{name}` not found (resolving `{path}`)"),
    )
}

/// Little-endian serialization of one element.
fn encode_numeric(tag: BytesTag, value: &Value, out: &mut Vec<u8>) -> RunResult<()> {
    fn int_of(value: &Value) -> RunResult<i64> {
        match value {
            Value::Int(n) => Ok(*n),
            Value::Bool(b) => Ok(i64::from(*b)),
            other => Err(RunError::type_error(format!(
                "byte-stream element must be an int, found {}",
                other.type_name()
            ))),
        }
    }
    fn ranged<T: TryFrom<i64>>(value: &Value, tag: BytesTag) -> RunResult<T> {
        T::try_from(int_of(value)?).map_err(|_| {
            RunError::runtime(format!("value {value} out of range for {tag}"))
        })
    }
    match tag {
        BytesTag::U8 => out.extend(ranged::<u8>(value, tag)?.to_le_bytes()),
        BytesTag::I8 => out.extend(ranged::<i8>(value, tag)?.to_le_bytes()),
        BytesTag::U16 => out.extend(ranged::<u16>(value, tag)?.to_le_bytes()),
        BytesTag::I16 => out.extend(ranged::<i16>(value, tag)?.to_le_bytes()),
        BytesTag::U32 => out.extend(ranged::<u32>(value, tag)?.to_le_bytes()),
        BytesTag::I32 => out.extend(ranged::<i32>(value, tag)?.to_le_bytes()),
        BytesTag::U64 => {
            let n = int_of(value)?;
            let wide = u64::try_from(n)
                .map_err(|_| RunError::runtime(format!("value {n} out of range for u64")))?;
            out.extend(wide.to_le_bytes());
        }
        BytesTag::I64 => out.extend(int_of(value)?.to_le_bytes()),
        BytesTag::F32 => {
            let f = value
                .as_number()
                .ok_or_else(|| RunError::type_error("byte-stream element must be a number"))?;
            out.extend((f as f32).to_le_bytes());
        }
        BytesTag::F64 => {
            let f = value
                .as_number()
                .ok_or_else(|| RunError::type_error("byte-stream element must be a number"))?;
            out.extend(f.to_le_bytes());
        }
        BytesTag::B1 => unreachable!("bit packing handled by caller"),
    }
    Ok(())
}

/// Resolved assignment target.
pub(crate) enum SetTarget {
    ScopeName(ScopeRef, String),
    DictKey(crate::value::DictRef, String),
    ListIndex(crate::value::ListRef, usize),
    SliceReplace(crate::value::ListRef, usize, usize),
    Locations(Vec<Location>),
    Host(HostRef, String),
    Dynamic(Value),
}

enum SetCursor {
    Val(Value),
    Pairs(Vec<(Location, Value)>),
}
