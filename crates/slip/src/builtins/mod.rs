//! Builtin functions.
//!
//! Every builtin is a variant of [`Builtins`]; the root scope binds each
//! one under its kebab-case name plus the infix operator aliases (`+` is a
//! piped path to `add`, `and` to `logical-and`, and so on). Dispatch is a
//! single match in [`call_builtin`], delegating to one module per
//! functional group.

mod collections;
mod control;
mod host;
mod logic;
mod math;
mod meta;
mod objects;
mod outcomes;
mod strings;
mod tasks;

use std::rc::Rc;

use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::{RunError, RunResult},
    interp::Evaluator,
    path::Path,
    scope::ScopeRef,
    value::{Code, Value},
};

/// Builtin functions bound in the root scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Builtins {
    // control flow (consume unevaluated code)
    If,
    While,
    Foreach,
    Loop,
    // logic
    LogicalAnd,
    LogicalOr,
    Not,
    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    // comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // collections
    Len,
    Copy,
    Clone,
    Push,
    Pop,
    Keys,
    Values,
    Contains,
    Range,
    // strings
    Join,
    Split,
    Dedent,
    // functions and objects
    Fn,
    Example,
    Guard,
    Scope,
    Create,
    Inherit,
    Mixin,
    TypeOf,
    // metaprogramming
    Run,
    RunWith,
    Inject,
    Splice,
    Call,
    ParsePath,
    // outcomes and effects
    Response,
    Respond,
    Return,
    Emit,
    WithLog,
    Do,
    // tasks
    Task,
    Sleep,
    MakeChannel,
    Send,
    Receive,
    CancelTasks,
    // host bridge
    Import,
    HostObject,
    Time,
    Print,
}

impl Builtins {
    /// Builtins invoked when referenced bare in head position (minimum
    /// arity zero).
    #[must_use]
    pub fn bare_callable(self) -> bool {
        matches!(
            self,
            Self::Time | Self::MakeChannel | Self::CancelTasks | Self::Scope
        )
    }
}

/// Operator aliases: each spelling is a piped path to its builtin, which is
/// what makes it usable infix under the accumulator rule.
const OPERATOR_ALIASES: &[(&str, &str)] = &[
    ("+", "add"),
    ("-", "sub"),
    ("*", "mul"),
    ("/", "div"),
    ("%", "mod"),
    ("=", "eq"),
    ("!=", "ne"),
    ("<", "lt"),
    ("<=", "le"),
    (">", "gt"),
    (">=", "ge"),
    ("and", "logical-and"),
    ("or", "logical-or"),
];

/// Binds every builtin and operator alias into the root scope.
pub(crate) fn install(root: &ScopeRef) {
    for builtin in Builtins::iter() {
        root.set_own(&builtin.to_string(), Value::Builtin(builtin));
    }
    for (alias, target) in OPERATOR_ALIASES {
        root.set_own(alias, Value::PipedPath(Rc::new(Path::name(*target))));
    }
}

pub(crate) async fn call_builtin(
    ev: &Evaluator,
    builtin: Builtins,
    args: Vec<Value>,
    scope: &ScopeRef,
) -> RunResult<Value> {
    match builtin {
        Builtins::If => control::r#if(ev, args, scope).await,
        Builtins::While => control::r#while(ev, args, scope).await,
        Builtins::Foreach => control::foreach(ev, args, scope).await,
        Builtins::Loop => control::r#loop(ev, args, scope).await,
        Builtins::LogicalAnd => logic::logical_and(args),
        Builtins::LogicalOr => logic::logical_or(args),
        Builtins::Not => logic::not(args),
        Builtins::Add => math::add(args),
        Builtins::Sub => math::sub(args),
        Builtins::Mul => math::mul(args),
        Builtins::Div => math::div(args),
        Builtins::Mod => math::modulo(args),
        Builtins::Pow => math::pow(args),
        Builtins::Eq | Builtins::Ne | Builtins::Lt | Builtins::Le | Builtins::Gt | Builtins::Ge => {
            math::compare(builtin, args)
        }
        Builtins::Len => collections::len(args),
        Builtins::Copy => collections::copy(args),
        Builtins::Clone => collections::clone(args),
        Builtins::Push => collections::push(args),
        Builtins::Pop => collections::pop(args),
        Builtins::Keys => collections::keys(args),
        Builtins::Values => collections::values(args),
        Builtins::Contains => collections::contains(args),
        Builtins::Range => collections::range(args),
        Builtins::Join => strings::join(args),
        Builtins::Split => strings::split(args),
        Builtins::Dedent => strings::dedent(args),
        Builtins::Fn => objects::r#fn(args, scope),
        Builtins::Example => objects::example(args),
        Builtins::Guard => objects::guard(args),
        Builtins::Scope => objects::scope(args),
        Builtins::Create => objects::create(args),
        Builtins::Inherit => objects::inherit(args),
        Builtins::Mixin => objects::mixin(args),
        Builtins::TypeOf => objects::type_of(args),
        Builtins::Run => meta::run(ev, args, scope).await,
        Builtins::RunWith => meta::run_with(ev, args, scope).await,
        Builtins::Inject | Builtins::Splice => Err(RunError::runtime(
            "inject/splice are only valid inside a code literal",
        )),
        Builtins::Call => meta::call(ev, args, scope).await,
        Builtins::ParsePath => meta::parse_path(args),
        Builtins::Response => outcomes::response(args),
        Builtins::Respond => outcomes::respond(args),
        Builtins::Return => outcomes::r#return(args),
        Builtins::Emit => outcomes::emit(ev, args),
        Builtins::WithLog | Builtins::Do => outcomes::with_log(ev, args, scope).await,
        Builtins::Task => tasks::task(ev, args, scope),
        Builtins::Sleep => tasks::sleep(ev, args).await,
        Builtins::MakeChannel => tasks::make_channel(args),
        Builtins::Send => tasks::send(ev, args).await,
        Builtins::Receive => tasks::receive(ev, args).await,
        Builtins::CancelTasks => tasks::cancel_tasks(ev, args),
        Builtins::Import => host::import(ev, args).await,
        Builtins::HostObject => host::host_object(ev, args),
        Builtins::Time => host::time(ev, args),
        Builtins::Print => host::print(ev, args),
    }
}

// --- argument helpers ---

pub(crate) fn exactly<const N: usize>(name: &str, args: Vec<Value>) -> RunResult<[Value; N]> {
    let got = args.len();
    args.try_into().map_err(|_| {
        RunError::type_error(format!("{name} takes {} argument(s), got {got}", N))
    })
}

pub(crate) fn between(
    name: &str,
    args: Vec<Value>,
    min: usize,
    max: usize,
) -> RunResult<Vec<Value>> {
    if args.len() < min || args.len() > max {
        return Err(RunError::type_error(format!(
            "{name} takes {min}..{max} argument(s), got {}",
            args.len()
        )));
    }
    Ok(args)
}

pub(crate) fn code_arg(name: &str, value: &Value) -> RunResult<Rc<Code>> {
    match value {
        Value::Code(code) => Ok(Rc::clone(code)),
        other => Err(RunError::type_error(format!(
            "{name} requires a code block, found {}",
            other.type_name()
        ))),
    }
}
