//! Callable values.

use crate::Value;
use std::fmt;
use std::rc::Rc;

type Callback = dyn Fn(&[Value]) -> Result<Value, Value>;

/// A function that can be called with arguments and returns a completion.
///
/// `Ok` is a normal return; `Err` carries a thrown value. Functions are
/// shared handles: cloning one yields the same callable.
///
/// # Examples
///
/// ```
/// use core_types::{Function, Value};
///
/// let add_one = Function::new(|args| match args.first() {
///     Some(Value::Smi(n)) => Ok(Value::Smi(n + 1)),
///     _ => Ok(Value::Undefined),
/// });
/// assert_eq!(add_one.call_one(Value::Smi(1)), Ok(Value::Smi(2)));
/// ```
#[derive(Clone)]
pub struct Function {
    callback: Rc<Callback>,
}

impl Function {
    /// Creates a new Function from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Value> + 'static,
    {
        Self {
            callback: Rc::new(f),
        }
    }

    /// Creates a function from a one-argument closure; missing arguments
    /// arrive as `undefined` and extra ones are ignored.
    pub fn unary<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, Value> + 'static,
    {
        Self::new(move |args| f(arg(args, 0)))
    }

    /// Creates a function that ignores its arguments and returns `undefined`.
    pub fn noop() -> Self {
        Self::new(|_| Ok(Value::Undefined))
    }

    /// Calls the function with the given arguments.
    pub fn call(&self, args: &[Value]) -> Result<Value, Value> {
        (self.callback)(args)
    }

    /// Calls the function with a single argument.
    pub fn call_one(&self, arg: Value) -> Result<Value, Value> {
        (self.callback)(std::slice::from_ref(&arg))
    }

    /// Returns true if both handles refer to the same callable.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function {{ ... }}")
    }
}

/// Returns the argument at `index`, or `undefined` when it was not passed.
pub fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}
