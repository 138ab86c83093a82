//! Public interface for running SLIP code.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::{
    capability::{Clock, HostObject, ModuleSource, SchemeHandler, TemplateEngine, to_kebab_case},
    effects::Effect,
    error::{CodeLoc, Error, ErrorKind, RunError},
    interp::{Evaluator, Machine},
    io::PrintWriter,
    resource::ResourceTracker,
    scope::ScopeRef,
    tracer::EvalTracer,
    transform,
    value::{Value, value_to_json},
};

/// How a script finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    /// The script ran to completion.
    Success,
    /// A runtime or parse error reached the top level.
    Error,
    /// The script exited via `return` at top level.
    Return,
}

/// The structured outcome of one script or expression.
///
/// A script never crashes the host: failures arrive here as
/// `status = Error` with the message, host status code, and location.
/// `side_effects` is the ordered snapshot of events emitted during this
/// execution.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub value: Value,
    pub error_message: Option<String>,
    pub error_status: Option<u16>,
    pub error_location: Option<CodeLoc>,
    pub side_effects: Vec<Effect>,
}

impl ExecutionResult {
    fn success(value: Value, side_effects: Vec<Effect>) -> Self {
        Self {
            status: ExecutionStatus::Success,
            value,
            error_message: None,
            error_status: None,
            error_location: None,
            side_effects,
        }
    }

    fn returned(value: Value, side_effects: Vec<Effect>) -> Self {
        Self {
            status: ExecutionStatus::Return,
            ..Self::success(value, side_effects)
        }
    }

    fn failed(error: &Error, side_effects: Vec<Effect>) -> Self {
        Self {
            status: ExecutionStatus::Error,
            value: Value::None,
            error_message: Some(error.message().to_owned()),
            error_status: Some(error.status()),
            error_location: error.location(),
            side_effects,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// JSON rendering for hosts that serialize results.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let effects: Vec<serde_json::Value> = self
            .side_effects
            .iter()
            .map(|effect| {
                serde_json::json!({
                    "topics": effect.topics,
                    "message": value_to_json(&effect.message),
                })
            })
            .collect();
        serde_json::json!({
            "status": match self.status {
                ExecutionStatus::Success => "success",
                ExecutionStatus::Error => "error",
                ExecutionStatus::Return => "return",
            },
            "value": value_to_json(&self.value),
            "error_message": self.error_message,
            "error_status": self.error_status,
            "error_location": self.error_location,
            "side_effects": effects,
        })
    }
}

/// A SLIP interpreter instance: root scope, type registry, side-effect
/// queue and cooperative scheduler. Single-threaded; nothing is shared
/// across instances.
///
/// # Example
/// ```
/// use slip::Interpreter;
///
/// let interp = Interpreter::new();
/// let result = interp.execute("x: 40\nx + 2");
/// assert_eq!(result.value, slip::Value::Int(42));
/// ```
pub struct Interpreter {
    machine: Rc<Machine>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            machine: Rc::new(Machine::new()),
        }
    }

    /// Runs a script in the interpreter's root scope and drives spawned
    /// tasks to quiescence. Bindings persist across calls.
    pub fn execute(&self, source: &str) -> ExecutionResult {
        let effects_start = self.machine.effects.borrow().len();
        let code = match transform::lower(source) {
            Ok(code) => Rc::new(code),
            Err(error) => return ExecutionResult::failed(&error, Vec::new()),
        };
        let evaluator = Evaluator::new(Rc::clone(&self.machine));
        let root = self.machine.root.clone();
        let main = self.machine.sched.spawn(
            Box::pin(async move {
                let value = evaluator.eval_code(&code, &root).await?;
                evaluator.materialize(value).await
            }),
            None,
        );
        let outcome = self.machine.sched.run_until_complete(main);
        let side_effects = self.machine.effects.borrow().since(effects_start);
        match outcome {
            Ok(value) => ExecutionResult::success(value, side_effects),
            Err(RunError::Respond(resp)) => {
                if resp.is_return() {
                    ExecutionResult::returned(resp.into_value(), side_effects)
                } else {
                    ExecutionResult::success(Value::Response(Rc::new(resp)), side_effects)
                }
            }
            Err(RunError::Error(error)) => ExecutionResult::failed(&error, side_effects),
            Err(RunError::Cancelled) => ExecutionResult::failed(
                &Error::new(ErrorKind::RuntimeError, "execution cancelled"),
                side_effects,
            ),
        }
    }

    /// Evaluates a single expression; identical to [`Self::execute`] but
    /// named for hosts embedding a REPL-style surface.
    pub fn eval_expression(&self, source: &str) -> ExecutionResult {
        self.execute(source)
    }

    /// The value bound at a name in the root scope, if any.
    #[must_use]
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.machine.root.lookup(name)
    }

    /// Binds a value in the root scope (host-provided inputs).
    pub fn set_global(&self, name: &str, value: Value) {
        self.machine.root.set_own(name, value);
    }

    /// All events emitted so far by this interpreter instance.
    #[must_use]
    pub fn side_effects(&self) -> Vec<Effect> {
        self.machine.effects.borrow().since(0)
    }

    // --- host capabilities ---

    pub fn set_resource_tracker(&self, tracker: impl ResourceTracker + 'static) {
        *self.machine.resources.borrow_mut() = Box::new(tracker);
    }

    pub fn set_tracer(&self, tracer: impl EvalTracer + 'static) {
        *self.machine.tracer.borrow_mut() = Box::new(tracer);
    }

    pub fn set_print_writer(&self, print: impl PrintWriter + 'static) {
        *self.machine.print.borrow_mut() = Box::new(print);
    }

    pub fn set_template_engine(&self, engine: impl TemplateEngine + 'static) {
        *self.machine.template.borrow_mut() = Box::new(engine);
    }

    pub fn set_clock(&self, clock: impl Clock + 'static) {
        *self.machine.clock.borrow_mut() = Box::new(clock);
    }

    /// Registers the handler behind `scheme://` paths.
    pub fn register_scheme_handler(&self, scheme: &str, handler: Rc<dyn SchemeHandler>) {
        self.machine
            .schemes
            .borrow_mut()
            .insert(scheme.to_owned(), handler);
    }

    /// Registers the source provider behind `import`.
    pub fn set_module_source(&self, source: Rc<dyn ModuleSource>) {
        *self.machine.module_source.borrow_mut() = Some(source);
    }

    /// Registers a host object for the `host-object(id)` gateway.
    pub fn register_host_object(&self, host: Rc<dyn HostObject>) {
        self.machine
            .host_objects
            .borrow_mut()
            .insert(host.id().to_owned(), host);
    }

    /// Attaches the interpreter to a host object: registers it, makes it
    /// the task-registration context, and exposes its approved methods as
    /// top-level kebab-case functions.
    pub fn attach_host_object(&self, host: Rc<dyn HostObject>) {
        let id = host.id().to_owned();
        for method in host.methods() {
            let name = to_kebab_case(&method);
            self.machine.root.set_own(
                &name,
                Value::HostFunction {
                    object: Rc::clone(&host),
                    method: Rc::from(method.as_str()),
                },
            );
        }
        self.register_host_object(host);
        *self.machine.host_context.borrow_mut() = Some(id);
    }

    /// Cancels every task registered to the given host object.
    pub fn cancel_host_tasks(&self, host_id: &str) {
        self.machine.sched.cancel_host(host_id);
    }

    /// Cancels all live tasks.
    pub fn cancel_tasks(&self) {
        self.machine.sched.cancel_all();
    }
}
