//! Error types for request construction, rendering and transport.
//!
//! # Design
//! Only `InvalidArgument` is ever returned to a caller: it signals a
//! programming error (parsing a state name that does not exist). Everything
//! that can go wrong with a single declarative request is recorded on the
//! `Request` as a `RequestError` and folded into its `RequestState`, so a
//! batch keeps running.

use std::fmt;

use crate::http::HttpMethod;

/// A `RequestState` was parsed from a name outside the fixed set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidArgument {
    pub value: String,
}

impl fmt::Display for InvalidArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid request state", self.value)
    }
}

impl std::error::Error for InvalidArgument {}

/// Rendering a template against an `Environment` failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The expression references a variable (or a member of one) that is
    /// not registered.
    UndefinedVariable(String),

    /// The template text itself is malformed or uses unsupported syntax.
    Syntax(String),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::UndefinedVariable(path) => write!(f, "'{path}' is undefined"),
            TemplateError::Syntax(msg) => write!(f, "template syntax error: {msg}"),
        }
    }
}

impl std::error::Error for TemplateError {}

/// The transport could not produce a response at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError(pub String);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transport failed: {}", self.0)
    }
}

impl std::error::Error for TransportError {}

/// Why a `Request` ended up in `ERROR` (or `FAILURE`, for transport errors).
#[derive(Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The raw request is not a mapping.
    NotAMapping,

    /// A required key is absent.
    MissingField(&'static str),

    /// A key is present but holds a value of the wrong shape.
    InvalidField { field: &'static str, reason: String },

    /// None of the recognized HTTP verb keys is present.
    MissingMethod,

    /// More than one HTTP verb key is present.
    AmbiguousMethod(Vec<HttpMethod>),

    Template(TemplateError),

    Transport(TransportError),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::NotAMapping => write!(f, "request must be a mapping"),
            RequestError::MissingField(field) => write!(f, "missing required field '{field}'"),
            RequestError::InvalidField { field, reason } => {
                write!(f, "invalid field '{field}': {reason}")
            }
            RequestError::MissingMethod => write!(f, "no HTTP method given"),
            RequestError::AmbiguousMethod(methods) => {
                let keys: Vec<&str> = methods.iter().map(|m| m.key()).collect();
                write!(f, "more than one HTTP method given: {}", keys.join(", "))
            }
            RequestError::Template(err) => write!(f, "{err}"),
            RequestError::Transport(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::Template(err) => Some(err),
            RequestError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TemplateError> for RequestError {
    fn from(err: TemplateError) -> Self {
        RequestError::Template(err)
    }
}

impl From<TransportError> for RequestError {
    fn from(err: TransportError) -> Self {
        RequestError::Transport(err)
    }
}
