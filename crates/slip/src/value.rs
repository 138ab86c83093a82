//! Primary value type representing SLIP values at runtime.
//!
//! SLIP is homoiconic: the typed AST the transformer produces is made of the
//! same [`Value`] variants the evaluator computes with. A code literal
//! evaluates to a [`Code`] value, a path literal to a path value, and so on.
//!
//! Mutable collections (lists, dicts, scopes, channels, generic functions)
//! are shared-reference values: cloning a [`Value`] clones the handle, not
//! the data. Immutable variants (numbers, strings, paths, responses,
//! expanded code) are `Rc`-shared and freely copyable.

use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    builtins::Builtins,
    capability::HostRef,
    dispatch::GenericFunction,
    error::CodeLoc,
    function::Function,
    path::{MultiSetPath, Path},
    response::Response,
    scheduler::{ChannelRef, TaskHandle},
    scope::ScopeRef,
    signature::Sig,
    view::View,
};

/// Shared mutable list handle.
pub type ListRef = Rc<RefCell<Vec<Value>>>;
/// Shared mutable ordered-map handle.
pub type DictRef = Rc<RefCell<IndexMap<String, Value>>>;

/// One expression: an ordered sequence of terms evaluated left to right
/// under the accumulator rule.
#[derive(Debug, Clone)]
pub struct Expr {
    pub terms: Vec<Value>,
    pub loc: Option<CodeLoc>,
}

impl Expr {
    #[must_use]
    pub fn new(terms: Vec<Value>) -> Self {
        Self { terms, loc: None }
    }

    #[must_use]
    pub fn at(terms: Vec<Value>, loc: CodeLoc) -> Self {
        Self { terms, loc: Some(loc) }
    }
}

/// A block of code: an ordered sequence of expressions plus the `expanded`
/// flag recording whether inject/splice expansion has already run.
#[derive(Debug, Clone)]
pub struct Code {
    pub exprs: Vec<Expr>,
    pub expanded: bool,
}

impl Code {
    #[must_use]
    pub fn new(exprs: Vec<Expr>) -> Self {
        Self { exprs, expanded: false }
    }
}

/// Element type tags of typed byte-stream constructors (`u8#[...]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum BytesTag {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    F32,
    F64,
    /// Booleans packed MSB-first, one bit each; a trailing partial byte is
    /// zero-padded on the right of the bit stream.
    B1,
}

/// Unevaluated typed byte-stream literal.
#[derive(Debug, Clone)]
pub struct BytesCtor {
    pub tag: BytesTag,
    pub items: Vec<Expr>,
}

/// Tagged union of every SLIP runtime value and AST node.
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Raw string (single-quoted source form, de-dented).
    Str(Rc<str>),
    /// Interpolated string. As AST this is the unrendered template; the
    /// evaluator renders it through the template engine. Semantically of
    /// type `string`.
    IStr(Rc<str>),
    Bytes(Rc<[u8]>),
    /// `` `path `` - a quoted path value.
    PathLiteral(Rc<Path>),
    GetPath(Rc<Path>),
    SetPath(Rc<Path>),
    DelPath(Rc<Path>),
    PostPath(Rc<Path>),
    PipedPath(Rc<Path>),
    MultiSetPath(Rc<MultiSetPath>),
    Code(Rc<Code>),
    Sig(Rc<Sig>),
    /// Parenthesized sub-expression; evaluated eagerly as a term.
    Group(Rc<Expr>),
    /// Unevaluated list literal (`#[...]`); evaluation builds a fresh list.
    ListCtor(Rc<Vec<Expr>>),
    /// Unevaluated dict literal (`#{...}`); evaluation builds a fresh dict.
    DictCtor(Rc<Vec<(String, Expr)>>),
    /// Unevaluated typed byte stream (`u8#[...]`).
    BytesCtor(Rc<BytesCtor>),
    List(ListRef),
    Dict(DictRef),
    Scope(ScopeRef),
    Function(Rc<Function>),
    Generic(Rc<RefCell<GenericFunction>>),
    Builtin(Builtins),
    Response(Rc<Response>),
    View(Rc<View>),
    Channel(ChannelRef),
    Task(TaskHandle),
    HostObject(HostRef),
    /// A host method surfaced as a callable (kebab-case name).
    HostFunction { object: HostRef, method: Rc<str> },
}

impl Value {
    #[must_use]
    pub fn str(s: impl AsRef<str>) -> Self {
        Self::Str(Rc::from(s.as_ref()))
    }

    #[must_use]
    pub fn list(items: Vec<Self>) -> Self {
        Self::List(Rc::new(RefCell::new(items)))
    }

    #[must_use]
    pub fn dict(map: IndexMap<String, Self>) -> Self {
        Self::Dict(Rc::new(RefCell::new(map)))
    }

    /// Canonical type name, as used by primitive dispatch annotations.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::IStr(_) => "i-string",
            Self::Bytes(_) => "bytes",
            Self::PathLiteral(_)
            | Self::GetPath(_)
            | Self::SetPath(_)
            | Self::DelPath(_)
            | Self::PostPath(_)
            | Self::PipedPath(_)
            | Self::MultiSetPath(_) => "path",
            Self::Code(_) | Self::Group(_) => "code",
            Self::Sig(_) => "sig",
            Self::List(_) | Self::ListCtor(_) => "list",
            Self::Dict(_) | Self::DictCtor(_) => "dict",
            Self::BytesCtor(_) => "bytes",
            Self::Scope(_) => "scope",
            Self::Function(_) | Self::Generic(_) | Self::Builtin(_) | Self::HostFunction { .. } => "function",
            Self::Response(_) => "response",
            Self::View(_) => "view",
            Self::Channel(_) => "channel",
            Self::Task(_) => "task",
            Self::HostObject(_) => "host-object",
        }
    }

    /// Truthiness: false, none, 0, 0.0, empty string, empty list and empty
    /// dict are falsey; everything else is truthy.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) | Self::IStr(s) => !s.is_empty(),
            Self::List(items) => !items.borrow().is_empty(),
            Self::Dict(map) => !map.borrow().is_empty(),
            _ => true,
        }
    }

    /// True for values the accumulator may call in head position.
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Self::Function(_) | Self::Generic(_) | Self::Builtin(_) | Self::HostFunction { .. }
        )
    }

    /// Numeric view for arithmetic and comparison builtins.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// String content for both string flavours.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) | Self::IStr(s) => Some(s),
            _ => None,
        }
    }

    /// Length of sized collections, `None` elsewhere.
    #[must_use]
    pub fn length(&self) -> Option<usize> {
        match self {
            Self::Str(s) | Self::IStr(s) => Some(s.chars().count()),
            Self::Bytes(b) => Some(b.len()),
            Self::List(items) => Some(items.borrow().len()),
            Self::Dict(map) => Some(map.borrow().len()),
            Self::Scope(scope) => Some(scope.data_len()),
            _ => None,
        }
    }

    /// Deep copy. Lists, dicts and scopes are copied recursively with no
    /// shared interior mutability; immutable variants share their `Rc`.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        match self {
            Self::List(items) => {
                let copied = items.borrow().iter().map(Self::deep_clone).collect();
                Self::list(copied)
            }
            Self::Dict(map) => {
                let copied = map
                    .borrow()
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_clone()))
                    .collect();
                Self::dict(copied)
            }
            Self::Scope(scope) => Self::Scope(scope.deep_clone()),
            other => other.clone(),
        }
    }

    /// Quoted/structured form used inside container displays.
    #[must_use]
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => format!("'{s}'"),
            Self::IStr(s) => format!("\"{s}\""),
            other => other.to_string(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            // Numeric cross-type equality
            (Self::Int(a), Self::Float(b)) | (Self::Float(b), Self::Int(a)) => (*a as f64) == *b,
            // Both string flavours compare by content
            (Self::Str(a) | Self::IStr(a), Self::Str(b) | Self::IStr(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (
                Self::PathLiteral(a) | Self::GetPath(a),
                Self::PathLiteral(b) | Self::GetPath(b),
            ) => a == b,
            (Self::SetPath(a), Self::SetPath(b))
            | (Self::DelPath(a), Self::DelPath(b))
            | (Self::PostPath(a), Self::PostPath(b))
            | (Self::PipedPath(a), Self::PipedPath(b)) => a == b,
            (Self::List(a), Self::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Self::Dict(a), Self::Dict(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Self::Scope(a), Self::Scope(b)) => a.same(b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Generic(a), Self::Generic(b)) => Rc::ptr_eq(a, b),
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Response(a), Self::Response(b)) => a == b,
            (Self::Channel(a), Self::Channel(b)) => Rc::ptr_eq(a, b),
            (Self::Task(a), Self::Task(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => {
                let mut buf = ryu::Buffer::new();
                f.write_str(buf.format(*x))
            }
            Self::Str(s) | Self::IStr(s) => f.write_str(s),
            Self::Bytes(b) => {
                f.write_str("u8#[")?;
                for (i, byte) in b.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{byte}")?;
                }
                f.write_str("]")
            }
            Self::PathLiteral(p) => write!(f, "`{p}"),
            Self::GetPath(p) => write!(f, "{p}"),
            Self::SetPath(p) => write!(f, "{p}:"),
            Self::DelPath(p) => write!(f, "~{p}"),
            Self::PostPath(p) => write!(f, "{p}<-"),
            Self::PipedPath(p) => write!(f, "|{p}"),
            Self::MultiSetPath(m) => write!(f, "{m}:"),
            Self::Code(code) => {
                let exprs: Vec<String> = code
                    .exprs
                    .iter()
                    .map(|e| {
                        let terms: Vec<String> = e.terms.iter().map(ToString::to_string).collect();
                        terms.join(" ")
                    })
                    .collect();
                write!(f, "[{}]", exprs.join("; "))
            }
            Self::Sig(sig) => write!(f, "{sig}"),
            Self::Group(expr) => {
                let terms: Vec<String> = expr.terms.iter().map(ToString::to_string).collect();
                write!(f, "({})", terms.join(" "))
            }
            Self::ListCtor(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|e| {
                        let terms: Vec<String> = e.terms.iter().map(ToString::to_string).collect();
                        terms.join(" ")
                    })
                    .collect();
                write!(f, "#[{}]", parts.join(", "))
            }
            Self::DictCtor(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, e)| {
                        let terms: Vec<String> = e.terms.iter().map(ToString::to_string).collect();
                        format!("{k}: {}", terms.join(" "))
                    })
                    .collect();
                write!(f, "#{{{}}}", parts.join(", "))
            }
            Self::BytesCtor(ctor) => {
                let parts: Vec<String> = ctor
                    .items
                    .iter()
                    .map(|e| {
                        let terms: Vec<String> = e.terms.iter().map(ToString::to_string).collect();
                        terms.join(" ")
                    })
                    .collect();
                write!(f, "{}#[{}]", ctor.tag, parts.join(", "))
            }
            Self::List(items) => {
                let parts: Vec<String> = items.borrow().iter().map(Value::repr).collect();
                write!(f, "#[{}]", parts.join(", "))
            }
            Self::Dict(map) => {
                let parts: Vec<String> = map
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.repr()))
                    .collect();
                write!(f, "#{{{}}}", parts.join(", "))
            }
            Self::Scope(scope) => write!(f, "{scope}"),
            Self::Function(func) => write!(f, "fn {}", func.sig),
            Self::Generic(gf) => {
                let gf = gf.borrow();
                write!(f, "generic {} ({} methods)", gf.name, gf.methods.len())
            }
            Self::Builtin(b) => write!(f, "builtin {b}"),
            Self::Response(resp) => write!(f, "{resp}"),
            Self::View(view) => write!(f, "{view}"),
            Self::Channel(_) => f.write_str("channel"),
            Self::Task(handle) => write!(f, "task {}", handle.id()),
            Self::HostObject(obj) => write!(f, "host-object {}", obj.id()),
            Self::HostFunction { method, .. } => write!(f, "host-function {method}"),
        }
    }
}

/// JSON projection for host-facing serialization: scheme-call bodies with
/// `content-type: application/json` and execution-result rendering.
///
/// Natural mappings cover none/bool/int/float/string/list/dict; scopes
/// serialize their data entries, responses as `{status, value}`, bytes as
/// a number array. Everything else falls back to its display text.
#[must_use]
pub fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::{Map, Number, Value as Json};
    match value {
        Value::None => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::Number(Number::from(*n)),
        Value::Float(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Str(s) | Value::IStr(s) => Json::String(s.to_string()),
        Value::Bytes(bytes) => Json::Array(
            bytes
                .iter()
                .map(|b| Json::Number(Number::from(*b)))
                .collect(),
        ),
        Value::List(items) => Json::Array(items.borrow().iter().map(value_to_json).collect()),
        Value::Dict(map) => {
            let mut out = Map::new();
            for (key, item) in map.borrow().iter() {
                out.insert(key.clone(), value_to_json(item));
            }
            Json::Object(out)
        }
        Value::Scope(scope) => {
            let mut out = Map::new();
            for key in scope.data_keys() {
                if let Some(item) = scope.get_own(&key) {
                    out.insert(key, value_to_json(&item));
                }
            }
            Json::Object(out)
        }
        Value::Response(resp) => {
            let mut out = Map::new();
            out.insert("status".to_owned(), Json::String(resp.status_text()));
            out.insert("value".to_owned(), value_to_json(resp.value()));
            Json::Object(out)
        }
        other => Json::String(other.to_string()),
    }
}

/// Strips the minimum common leading whitespace of non-empty lines.
///
/// Applied to both raw and interpolated string literals before any further
/// processing.
#[must_use]
pub fn dedent(text: &str) -> String {
    let min_indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0);
    if min_indent == 0 {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut first = true;
    for line in text.lines() {
        if !first {
            out.push('\n');
        }
        first = false;
        if line.len() >= min_indent {
            out.push_str(&line[min_indent..]);
        } else {
            out.push_str(line.trim_start_matches([' ', '\t']));
        }
    }
    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}
