//! Core value types shared by the promise runtime and its collaborators.
//!
//! # Overview
//!
//! - [`Value`] - Dynamic values carried through promise chains
//! - [`JsError`] - Errors with a kind and message
//! - [`ErrorKind`] - Types of errors, including cancellation
//! - [`Function`] - Shared callable handles
//! - [`JsObject`] - Plain property bags
//! - [`Thenable`] - The capability a promise can adopt
//!
//! # Examples
//!
//! ```
//! use core_types::{JsError, Value};
//!
//! let num = Value::Smi(42);
//! assert_eq!(num.to_string(), "42");
//!
//! let reason = Value::from(JsError::cancellation("request aborted"));
//! assert!(reason.is_cancellation());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod function;
mod object;
mod thenable;
mod value;

pub use error::{ErrorKind, JsError};
pub use function::{arg, Function};
pub use object::JsObject;
pub use thenable::Thenable;
pub use value::Value;
