//! Dynamic value representation.
//!
//! This module provides the `Value` enum carried through promise chains as
//! fulfillment values and rejection reasons.

use crate::{Function, JsError, JsObject, Thenable};
use std::fmt;
use std::rc::Rc;

/// Represents any value a promise can settle with.
///
/// Primitive values are stored inline. Objects, functions and thenables are
/// shared references and compare by identity.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let number = Value::Smi(42);
/// assert_eq!(number, Value::Double(42.0));
/// assert_eq!(number.to_string(), "42");
/// assert_eq!(Value::Undefined.get("then"), Value::Undefined);
/// ```
#[derive(Clone)]
pub enum Value {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean (true or false)
    Boolean(bool),
    /// Small integer
    Smi(i32),
    /// IEEE 754 double-precision floating point
    Double(f64),
    /// String value
    String(String),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// Plain object with named properties
    Object(JsObject),
    /// Callable function
    Function(Function),
    /// Error value
    Error(JsError),
    /// A value implementing the typed thenable capability
    Thenable(Rc<dyn Thenable>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => f.debug_tuple("Boolean").field(b).finish(),
            Value::Smi(n) => f.debug_tuple("Smi").field(n).finish(),
            Value::Double(n) => f.debug_tuple("Double").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(obj) => f.debug_tuple("Object").field(obj).finish(),
            Value::Function(_) => write!(f, "Function(...)"),
            Value::Error(e) => f.debug_tuple("Error").field(e).finish(),
            Value::Thenable(_) => write!(f, "Thenable(...)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Smi(a), Value::Smi(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Smi(a), Value::Double(b)) | (Value::Double(b), Value::Smi(a)) => {
                f64::from(*a) == *b
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Thenable(a), Value::Thenable(b)) => a.identity() == b.identity(),
            _ => false,
        }
    }
}

impl Value {
    /// Returns true if this value is an error of kind `CancellationError`.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Value::Error(e) if e.is_cancellation())
    }

    /// Looks up a named property.
    ///
    /// Objects expose their own properties; errors expose `message` and
    /// `name`; arrays expose `length`. Everything else yields `undefined`.
    pub fn get(&self, key: &str) -> Value {
        match (self, key) {
            (Value::Object(obj), _) => obj.get(key),
            (Value::Error(e), "message") => Value::String(e.message.clone()),
            (Value::Error(e), "name") => Value::String(e.kind.to_string()),
            (Value::Array(items), "length") => {
                i32::try_from(items.len()).map_or(Value::Double(items.len() as f64), Value::Smi)
            }
            _ => Value::Undefined,
        }
    }
}

impl From<JsError> for Value {
    fn from(error: JsError) -> Self {
        Value::Error(error)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Smi(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<JsObject> for Value {
    fn from(obj: JsObject) -> Self {
        Value::Object(obj)
    }
}

/// String conversion following `String(value)`.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// assert_eq!(Value::Undefined.to_string(), "undefined");
/// assert_eq!(Value::Double(2.0).to_string(), "2");
/// assert_eq!(Value::Array(vec![Value::Smi(1), Value::Null]).to_string(), "1,");
/// ```
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Smi(n) => write!(f, "{}", n),
            Value::Double(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if n.is_sign_positive() {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    // Integer-valued doubles display without decimal point
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if !matches!(item, Value::Undefined | Value::Null) {
                        write!(f, "{}", item)?;
                    }
                }
                Ok(())
            }
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(_) => write!(f, "function () {{ [native code] }}"),
            Value::Error(e) => write!(f, "{}", e),
            Value::Thenable(_) => write!(f, "[object Promise]"),
        }
    }
}
