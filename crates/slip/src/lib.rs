#![doc = include_str!("../../../README.md")]

mod builtins;
pub mod capability;
mod dispatch;
mod effects;
mod error;
mod expand;
mod function;
mod interp;
mod io;
mod lex;
mod parse;
mod path;
mod registry;
mod resource;
mod response;
mod run;
mod scheduler;
mod scope;
mod signature;
mod tracer;
mod transform;
mod value;
mod view;

pub use crate::{
    builtins::Builtins,
    capability::{
        Clock, HostObject, HostRef, ModuleSource, SchemeHandler, SchemeOp, SimpleTemplateEngine,
        SystemClock, TemplateContext, TemplateEngine, to_kebab_case,
    },
    dispatch::GenericFunction,
    effects::Effect,
    error::{CodeLoc, Error, ErrorKind},
    function::{Function, FunctionMeta},
    io::{CollectStringPrint, NoPrint, PrintWriter, StdPrint},
    path::{CompareOp, Filter, MultiSetPath, Path, QueryNode, Segment},
    registry::{TypeId, TypeRegistry},
    resource::{
        DEFAULT_MAX_CALL_DEPTH, LimitedTracker, NoLimitTracker, ResourceError, ResourceTracker,
    },
    response::Response,
    run::{ExecutionResult, ExecutionStatus, Interpreter},
    scheduler::{ChannelRef, ChannelState, TaskHandle, make_channel},
    scope::{ScopeData, ScopeMeta, ScopeRef},
    signature::{Sig, SigSpec},
    tracer::{EvalTracer, NoopTracer, RecordingTracer, StderrTracer, TraceEvent},
    transform::{lower, path_from_text},
    value::{BytesCtor, BytesTag, Code, DictRef, Expr, ListRef, Value, dedent, value_to_json},
    view::View,
};
