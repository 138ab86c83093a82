//! Error taxonomy and non-local control signals.
//!
//! Runtime failures and control-flow signals travel through the same channel:
//! [`RunError`]. Plain failures carry an [`Error`]; `respond`/`return` unwind
//! as [`RunError::Respond`] until a call boundary absorbs them; task
//! cancellation unwinds as [`RunError::Cancelled`] to the task boundary.
//!
//! The public [`Error`] type is what a host sees: a failure kind, a message,
//! and (when available) a source location. Kinds map onto the status-code
//! taxonomy the host renders (400 syntax, 404 path, 500 runtime, 501
//! unimplemented).

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::response::Response;

/// Result type alias for operations that can produce a runtime error.
pub(crate) type RunResult<T> = Result<T, RunError>;

/// Failure kinds raised by the interpreter.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and
/// `Into<&'static str>` implementations. The string representation matches
/// the variant name (e.g. `PathNotFound` -> "PathNotFound").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Parse failure; fatal to the current script.
    SyntaxError,
    /// Name not found in the lexical chain or property chain.
    PathNotFound,
    /// Wrong value shape for an operation.
    TypeError,
    /// No matching method, or an ambiguous method call.
    DispatchError,
    /// Violation of the inherit-once rule.
    InheritanceError,
    /// A guard or assertion-style failure.
    GuardError,
    /// Generic runtime failure (bad call, arithmetic error, ...).
    RuntimeError,
    /// A capability the host did not provide.
    Unimplemented,
    /// Resource limit exceeded (operations, recursion, time).
    ResourceExhausted,
}

impl ErrorKind {
    /// Status code forwarded to the host for this failure kind.
    ///
    /// 400-class for syntax, 404 for unresolved paths, 501 for missing
    /// capabilities, 500 for everything else.
    #[must_use]
    pub fn status(self) -> u16 {
        match self {
            Self::SyntaxError => 400,
            Self::PathNotFound => 404,
            Self::Unimplemented => 501,
            Self::TypeError
            | Self::DispatchError
            | Self::InheritanceError
            | Self::GuardError
            | Self::RuntimeError
            | Self::ResourceExhausted => 500,
        }
    }
}

/// A location in the source text, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLoc {
    pub line: u32,
    pub column: u32,
}

impl CodeLoc {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for CodeLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A runtime or parse failure with its kind, message and optional location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    location: Option<CodeLoc>,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, loc: CodeLoc) -> Self {
        self.location = Some(loc);
        self
    }

    /// Attaches a location only if the error does not already carry one.
    ///
    /// Errors keep the innermost location they were raised with.
    #[must_use]
    pub(crate) fn or_location(mut self, loc: Option<CodeLoc>) -> Self {
        if self.location.is_none() {
            self.location = loc;
        }
        self
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn location(&self) -> Option<CodeLoc> {
        self.location
    }

    /// The host-facing status code for this error.
    #[must_use]
    pub fn status(&self) -> u16 {
        self.kind.status()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{}: {} ({loc})", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for Error {}

/// Internal error channel: failures plus the two non-local control signals.
///
/// `Respond` is not a failure: it carries a [`Response`] produced by
/// `respond`/`return` and is absorbed at the nearest function-call boundary
/// (or the script top level). `Cancelled` unwinds a cancelled task to its
/// boundary and is never user-visible unless it escapes the task.
#[derive(Debug, Clone)]
pub(crate) enum RunError {
    Error(Box<Error>),
    Respond(Response),
    Cancelled,
}

impl RunError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error(Box::new(Error::new(kind, message)))
    }

    pub fn syntax(message: impl Into<String>, loc: CodeLoc) -> Self {
        Self::Error(Box::new(Error::new(ErrorKind::SyntaxError, message).with_location(loc)))
    }

    pub fn path_not_found(name: &str) -> Self {
        Self::new(ErrorKind::PathNotFound, format!("`{name}` not found"))
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RuntimeError, message)
    }

    /// Attaches a location to the inner error if it lacks one.
    ///
    /// Control signals pass through untouched.
    pub fn or_location(self, loc: Option<CodeLoc>) -> Self {
        match self {
            Self::Error(err) => Self::Error(Box::new(err.or_location(loc))),
            other => other,
        }
    }
}

impl From<Error> for RunError {
    fn from(err: Error) -> Self {
        Self::Error(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ErrorKind::SyntaxError.status(), 400);
        assert_eq!(ErrorKind::PathNotFound.status(), 404);
        assert_eq!(ErrorKind::TypeError.status(), 500);
        assert_eq!(ErrorKind::DispatchError.status(), 500);
        assert_eq!(ErrorKind::InheritanceError.status(), 500);
        assert_eq!(ErrorKind::Unimplemented.status(), 501);
    }

    #[test]
    fn inner_location_wins() {
        let inner = CodeLoc::new(2, 5);
        let outer = CodeLoc::new(1, 1);
        let err = Error::new(ErrorKind::RuntimeError, "boom").with_location(inner);
        assert_eq!(err.or_location(Some(outer)).location(), Some(inner));
    }
}
