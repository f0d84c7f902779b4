//! JavaScript-style error values.
//!
//! Errors are ordinary values in this runtime: a handler that fails returns
//! `Err(Value)`, and most of those values wrap a [`JsError`].

use std::fmt;
use thiserror::Error;

/// The kind of error.
///
/// These correspond to the built-in error constructors, plus the
/// distinguished cancellation kind used by cancellable promises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Plain `Error`
    Error,
    /// Type error (e.g., a promise resolved with itself)
    TypeError,
    /// Deliberate cancellation rather than failure
    CancellationError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Error => "Error",
            ErrorKind::TypeError => "TypeError",
            ErrorKind::CancellationError => "CancellationError",
        };
        f.write_str(name)
    }
}

/// An error with a kind and a human-readable message.
///
/// # Examples
///
/// ```
/// use core_types::{ErrorKind, JsError};
///
/// let error = JsError::type_error("undefined is not a function");
/// assert_eq!(error.kind, ErrorKind::TypeError);
/// assert_eq!(error.to_string(), "TypeError: undefined is not a function");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct JsError {
    /// The type of error
    pub kind: ErrorKind,
    /// Human-readable error message
    pub message: String,
}

impl JsError {
    /// Creates an error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Creates a plain `Error`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Error, message)
    }

    /// Creates a `TypeError`.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TypeError, message)
    }

    /// Creates a cancellation error.
    pub fn cancellation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::CancellationError, message)
    }

    /// Returns true if this error represents deliberate cancellation.
    pub fn is_cancellation(&self) -> bool {
        self.kind == ErrorKind::CancellationError
    }
}
