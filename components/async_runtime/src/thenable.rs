//! Thenable detection and adoption.
//!
//! Two kinds of values can be adopted by a promise:
//!
//! - `Value::Thenable`: anything implementing the typed [`Thenable`]
//!   capability. Our own [`Promise`] is subscribed to directly; other
//!   implementors have their `then` called.
//! - `Value::Object` whose `then` property is a function. This is the
//!   interop path for foreign promise libraries.
//!
//! Any foreign `then` may call back more than once or throw after calling
//! back, so the callbacks handed to it share a [`FirstCallGuard`].
//!
//! [`Thenable`]: core_types::Thenable

use crate::promise::Promise;
use crate::scheduler;
use core_types::{arg, Function, Value};
use std::cell::Cell;
use std::rc::Rc;

/// Lets exactly one of a set of callbacks through.
///
/// # Examples
///
/// ```
/// use async_runtime::FirstCallGuard;
///
/// let guard = FirstCallGuard::new();
/// assert!(guard.claim());
/// assert!(!guard.claim());
/// assert!(guard.is_claimed());
/// ```
#[derive(Debug, Default)]
pub struct FirstCallGuard {
    called: Cell<bool>,
}

impl FirstCallGuard {
    /// Creates an unclaimed guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for the first call only.
    pub fn claim(&self) -> bool {
        !self.called.replace(true)
    }

    /// Returns true once any call has been let through.
    pub fn is_claimed(&self) -> bool {
        self.called.get()
    }

    /// Wraps `f` so it runs only if it is the first guarded call.
    pub fn wrap(self: &Rc<Self>, f: Function) -> Function {
        let guard = Rc::clone(self);
        Function::new(move |args| {
            if guard.claim() {
                f.call_one(arg(args, 0))
            } else {
                Ok(Value::Undefined)
            }
        })
    }
}

/// Returns true if `value` would be adopted rather than used as-is.
///
/// # Examples
///
/// ```
/// use async_runtime::{is_thenable, Promise};
/// use core_types::{Function, JsObject, Value};
///
/// let foreign = JsObject::new();
/// foreign.set("then", Value::Function(Function::noop()));
///
/// assert!(is_thenable(&Value::Object(foreign)));
/// assert!(is_thenable(&Promise::resolve(Value::Null).into()));
/// assert!(!is_thenable(&Value::Object(JsObject::new())));
/// ```
pub fn is_thenable(value: &Value) -> bool {
    match value {
        Value::Thenable(_) => true,
        Value::Object(obj) => matches!(obj.get("then"), Value::Function(_)),
        _ => false,
    }
}

/// Subscribes the callbacks to `value` if it is a thenable.
///
/// Returns false, without calling anything, if `value` is a plain value.
pub(crate) fn maybe_then(value: &Value, on_fulfilled: &Function, on_rejected: &Function) -> bool {
    match value {
        Value::Thenable(thenable) => {
            if let Some(promise) = thenable.as_any().downcast_ref::<Promise>() {
                promise.then_void(Some(on_fulfilled.clone()), Some(on_rejected.clone()));
            } else {
                guarded_then(
                    |resolve, reject| thenable.then(resolve, reject),
                    on_fulfilled,
                    on_rejected,
                );
            }
            true
        }
        Value::Object(obj) => match obj.get("then") {
            Value::Function(then) => {
                try_then(&then, on_fulfilled, on_rejected);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Like [`maybe_then`], but plain values are delivered to `on_fulfilled`
/// from the run queue.
pub(crate) fn maybe_then_void(value: Value, on_fulfilled: Function, on_rejected: Function) {
    if !maybe_then(&value, &on_fulfilled, &on_rejected) {
        scheduler::schedule(move || on_fulfilled.call_one(value).map(drop));
    }
}

fn try_then(then: &Function, on_fulfilled: &Function, on_rejected: &Function) {
    guarded_then(
        |resolve, reject| {
            then.call(&[Value::Function(resolve), Value::Function(reject)]).map(drop)
        },
        on_fulfilled,
        on_rejected,
    );
}

/// Hands `subscribe` callbacks sharing one [`FirstCallGuard`], so a foreign
/// `then` that calls back more than once only settles once.
fn guarded_then<S>(subscribe: S, on_fulfilled: &Function, on_rejected: &Function)
where
    S: FnOnce(Function, Function) -> Result<(), Value>,
{
    let guard = Rc::new(FirstCallGuard::new());
    let resolve = guard.wrap(on_fulfilled.clone());
    let reject = guard.wrap(on_rejected.clone());
    if let Err(thrown) = subscribe(resolve, reject.clone()) {
        // Ignored by the guard if the thenable already called back.
        deliver(&reject, thrown);
    }
}

fn deliver(callback: &Function, value: Value) {
    if let Err(thrown) = callback.call_one(value) {
        scheduler::report_uncaught(thrown);
    }
}
