//! The typed thenable capability.

use crate::{Function, Value};
use std::any::Any;

/// A value that can be adopted by a promise.
///
/// Implementors register `on_fulfilled` / `on_rejected` and call exactly one
/// of them, once, when they settle. Promises adopt any `Value::Thenable`
/// directly; plain objects with a callable `then` property go through the
/// guarded duck-typed path instead.
pub trait Thenable {
    /// Registers settlement callbacks. An `Err` return is treated as a throw.
    fn then(&self, on_fulfilled: Function, on_rejected: Function) -> Result<(), Value>;

    /// Allows downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Address of the shared state behind this handle, used for identity.
    fn identity(&self) -> *const () {
        self.as_any() as *const dyn Any as *const ()
    }
}
