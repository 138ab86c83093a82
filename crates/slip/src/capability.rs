//! Host bridge: the narrow capability surface the core consumes.
//!
//! Everything host-specific stays behind these traits: opaque host objects,
//! scheme-prefixed path handlers (`file://`, `http://`, ...), the template
//! engine rendering interpolated strings, the clock, and module sources for
//! `import`. The core never performs I/O itself.

use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{
    error::{Error, ErrorKind},
    path::Path,
    scope::ScopeRef,
    value::Value,
};

/// Operations forwarded to a scheme handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SchemeOp {
    /// A get-path read.
    Read,
    /// A set-path write; the payload is the written value.
    Write,
    /// A del-path delete.
    Delete,
    /// A post-path submit; the payload is the request body.
    Post,
}

/// Handler for one scheme prefix.
///
/// The configuration dict is the evaluated `#(...)` block; unknown options
/// are forwarded verbatim. `lite`/`full` response shaping happens in the
/// core after the handler returns.
pub trait SchemeHandler {
    fn handle(
        &self,
        op: SchemeOp,
        path: &Path,
        configuration: &IndexMap<String, Value>,
        payload: Option<Value>,
    ) -> Result<Value, Error>;
}

/// An opaque host-managed object addressable by key, with a set of approved
/// methods the script may call.
///
/// Method names are reported in the host's own convention; the core
/// surfaces them to scripts in kebab-case.
pub trait HostObject: fmt::Debug {
    /// Stable identifier, also the `host-object(id)` gateway key.
    fn id(&self) -> &str;

    fn get(&self, key: &str) -> Option<Value>;

    fn set(&self, key: &str, value: Value) -> Result<(), Error>;

    fn delete(&self, key: &str) -> Result<(), Error>;

    /// The approved method list (host convention names).
    fn methods(&self) -> Vec<String>;

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, Error>;
}

/// Shared host-object handle.
pub type HostRef = Rc<dyn HostObject>;

/// Key-lookup protocol the template engine renders against. The scope
/// implementation walks the lexical parent chain, the same rule get-paths
/// use.
pub trait TemplateContext {
    fn lookup(&self, key: &str) -> Option<Value>;
}

impl TemplateContext for ScopeRef {
    fn lookup(&self, key: &str) -> Option<Value> {
        Self::lookup(self, key)
    }
}

/// Renders interpolated strings. The concrete library is a host plug-in;
/// the core only depends on this interface.
pub trait TemplateEngine {
    fn render(&self, template: &str, context: &dyn TemplateContext) -> Result<String, Error>;
}

/// Minimal `{{ name }}` substitution engine, the default plug-in.
///
/// Dotted keys walk dict entries and scope properties. Unresolved keys
/// render as empty text. Hosts wanting real template semantics install
/// their own engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTemplateEngine;

impl TemplateEngine for SimpleTemplateEngine {
    fn render(&self, template: &str, context: &dyn TemplateContext) -> Result<String, Error> {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let tail = &rest[start + 2..];
            let Some(end) = tail.find("}}") else {
                return Err(Error::new(
                    ErrorKind::RuntimeError,
                    "unterminated {{ in template",
                ));
            };
            let key = tail[..end].trim();
            if let Some(value) = lookup_dotted(context, key) {
                out.push_str(&value.to_string());
            }
            rest = &tail[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn lookup_dotted(context: &dyn TemplateContext, key: &str) -> Option<Value> {
    let mut parts = key.split('.');
    let mut current = context.lookup(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Dict(map) => map.borrow().get(part).cloned()?,
            Value::Scope(scope) => scope.lookup_property(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Time source for the `time` builtin.
pub trait Clock {
    /// Seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// Wall clock backed by chrono.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        let now = chrono::Utc::now();
        now.timestamp_millis() as f64 / 1000.0
    }
}

/// Source text provider for `import`. The core caches modules by canonical
/// path and executes each one exactly once.
pub trait ModuleSource {
    fn load(&self, path: &Path) -> Result<String, Error>;
}

/// Converts a host-convention name (`snake_case` or `camelCase`) to the
/// kebab-case form scripts see.
#[must_use]
pub fn to_kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    for (i, ch) in name.chars().enumerate() {
        if ch == '_' {
            out.push('-');
        } else if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_engine_substitutes_lexical_names() {
        let scope = ScopeRef::new();
        scope.set_own("name", Value::str("slip"));
        let engine = SimpleTemplateEngine;
        let out = engine.render("hello {{ name }}!", &scope).unwrap();
        assert_eq!(out, "hello slip!");
    }

    #[test]
    fn dotted_keys_walk_properties() {
        let inner = ScopeRef::new();
        inner.set_own("hp", Value::Int(7));
        let scope = ScopeRef::new();
        scope.set_own("player", Value::Scope(inner));
        let out = SimpleTemplateEngine
            .render("{{ player.hp }}", &scope)
            .unwrap();
        assert_eq!(out, "7");
    }

    #[test]
    fn missing_keys_render_empty() {
        let scope = ScopeRef::new();
        let out = SimpleTemplateEngine.render("[{{ nope }}]", &scope).unwrap();
        assert_eq!(out, "[]");
    }

    #[test]
    fn kebab_translation() {
        assert_eq!(to_kebab_case("cancel_tasks"), "cancel-tasks");
        assert_eq!(to_kebab_case("sendMessage"), "send-message");
    }
}
