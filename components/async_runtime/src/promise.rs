//! Cancellable promise implementation following Promises/A+.
//!
//! A [`Promise`] is a shared handle to a state machine:
//!
//! ```text
//! Pending --fulfill(v)--> Fulfilled
//! Pending --reject(r)---> Rejected
//! Pending --(*, thenable)--> Blocked --adopted outcome--> Pending --> Fulfilled | Rejected
//! ```
//!
//! Callbacks registered with `then` and friends are kept as an ordered list
//! of entries and always run from the async run queue, never synchronously.
//! Every promise created by `then` keeps a weak link to its parent so that
//! cancelling it can travel back up a chain whose only consumer it is.

use crate::rejection::{self, RejectionWatch};
use crate::scheduler;
use crate::thenable;
use core_types::{arg, Function, JsError, Thenable, Value};
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

/// Message used when `cancel` is called without one.
pub const DEFAULT_CANCEL_MESSAGE: &str = "Promise was cancelled";

/// The state of a Promise.
///
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// Not yet resolved.
    Pending,
    /// Resolved with a thenable whose outcome is being adopted.
    Blocked,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a reason.
    Rejected,
}

type Reaction = Box<dyn FnOnce(Value) -> Result<(), Value>>;

enum Reactions {
    Pair {
        on_fulfilled: Option<Reaction>,
        on_rejected: Option<Reaction>,
    },
    Always(Box<dyn FnOnce() -> Result<(), Value>>),
}

struct CallbackEntry {
    child: Option<Promise>,
    reactions: Reactions,
}

impl CallbackEntry {
    fn is_always(&self) -> bool {
        matches!(self.reactions, Reactions::Always(_))
    }

    fn observes_rejection(&self) -> bool {
        matches!(
            self.reactions,
            Reactions::Pair {
                on_rejected: Some(_),
                ..
            }
        )
    }

    fn invoke(self, state: PromiseState, result: Value) -> Result<(), Value> {
        match self.reactions {
            Reactions::Always(f) => f(),
            Reactions::Pair {
                on_fulfilled,
                on_rejected,
            } => {
                let reaction = if state == PromiseState::Fulfilled {
                    on_fulfilled
                } else {
                    on_rejected
                };
                reaction.map_or(Ok(()), |f| f(result))
            }
        }
    }
}

struct Inner {
    state: PromiseState,
    result: Option<Value>,
    parent: Option<Weak<RefCell<Inner>>>,
    callback_entries: VecDeque<CallbackEntry>,
    executing: bool,
    rejection_watch: RejectionWatch,
}

/// A cancellable promise.
///
/// Cloning a `Promise` yields another handle to the same promise.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Promise, PromiseState};
/// use core_types::{Function, Value};
///
/// let promise = Promise::resolve(Value::Smi(5))
///     .then(Some(Function::unary(|v| match v {
///         Value::Smi(n) => Ok(Value::Smi(n + 1)),
///         other => Ok(other),
///     })), None);
///
/// assert_eq!(promise.state(), PromiseState::Pending);
/// EventLoop::current().run_until_idle();
/// assert_eq!(promise.result(), Some(Value::Smi(6)));
/// ```
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<Inner>>,
}

impl Promise {
    /// Creates a promise and runs `resolver` synchronously with its resolve
    /// and reject functions.
    ///
    /// If `resolver` returns `Err`, the promise is rejected with that value
    /// (unless it was already resolved).
    pub fn new<F>(resolver: F) -> Promise
    where
        F: FnOnce(Function, Function) -> Result<(), Value>,
    {
        let promise = Promise::pending();
        let (resolve, reject) = promise.resolving_functions();
        if let Err(reason) = resolver(resolve, reject) {
            promise.resolve_inner(PromiseState::Rejected, reason);
        }
        promise
    }

    /// Creates a pending promise together with the means to settle it.
    pub fn with_resolver() -> Resolver {
        let promise = Promise::pending();
        let (resolve, reject) = promise.resolving_functions();
        Resolver {
            promise,
            resolve,
            reject,
        }
    }

    pub(crate) fn pending() -> Promise {
        Promise {
            inner: Rc::new(RefCell::new(Inner {
                state: PromiseState::Pending,
                result: None,
                parent: None,
                callback_entries: VecDeque::new(),
                executing: false,
                rejection_watch: RejectionWatch::Idle,
            })),
        }
    }

    /// Current state.
    pub fn state(&self) -> PromiseState {
        self.inner.borrow().state
    }

    /// The fulfillment value or rejection reason; `None` until settled.
    pub fn result(&self) -> Option<Value> {
        self.inner.borrow().result.clone()
    }

    /// Returns true once the promise is fulfilled or rejected.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.state(),
            PromiseState::Fulfilled | PromiseState::Rejected
        )
    }

    /// Returns true if both handles refer to the same promise.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Extracts the promise wrapped in a value, if it holds one.
    pub fn from_value(value: &Value) -> Option<Promise> {
        match value {
            Value::Thenable(thenable) => thenable.as_any().downcast_ref::<Promise>().cloned(),
            _ => None,
        }
    }

    /// Registers handlers and returns the promise of their outcome.
    ///
    /// A missing `on_fulfilled` passes the value through; a missing
    /// `on_rejected` passes the reason through. If `on_rejected` returns
    /// `undefined` for a cancellation, the cancellation is propagated to the
    /// returned promise rather than swallowed.
    pub fn then(&self, on_fulfilled: Option<Function>, on_rejected: Option<Function>) -> Promise {
        let child = Promise::pending();
        child.inner.borrow_mut().parent = Some(Rc::downgrade(&self.inner));

        let target = child.clone();
        let on_fulfilled: Reaction = match on_fulfilled {
            Some(handler) => Box::new(move |value| {
                match handler.call_one(value) {
                    Ok(result) => target.resolve_inner(PromiseState::Fulfilled, result),
                    Err(thrown) => target.resolve_inner(PromiseState::Rejected, thrown),
                }
                Ok(())
            }),
            None => Box::new(move |value| {
                target.resolve_inner(PromiseState::Fulfilled, value);
                Ok(())
            }),
        };

        let target = child.clone();
        let on_rejected: Reaction = match on_rejected {
            Some(handler) => Box::new(move |reason| {
                let cancelled = reason.is_cancellation();
                match handler.call_one(reason.clone()) {
                    Ok(Value::Undefined) if cancelled => {
                        target.resolve_inner(PromiseState::Rejected, reason)
                    }
                    Ok(result) => target.resolve_inner(PromiseState::Fulfilled, result),
                    Err(thrown) => target.resolve_inner(PromiseState::Rejected, thrown),
                }
                Ok(())
            }),
            None => Box::new(move |reason| {
                target.resolve_inner(PromiseState::Rejected, reason);
                Ok(())
            }),
        };

        self.add_callback_entry(CallbackEntry {
            child: Some(child.clone()),
            reactions: Reactions::Pair {
                on_fulfilled: Some(on_fulfilled),
                on_rejected: Some(on_rejected),
            },
        });
        child
    }

    /// Registers a rejection handler. Same as `then(None, Some(on_rejected))`.
    pub fn catch(&self, on_rejected: Function) -> Promise {
        self.then(None, Some(on_rejected))
    }

    /// Alias of [`Promise::catch`].
    pub fn then_catch(&self, on_rejected: Function) -> Promise {
        self.catch(on_rejected)
    }

    /// Registers handlers without creating a child promise.
    ///
    /// Whatever the handlers return is discarded; an `Err` is reported as an
    /// uncaught error.
    pub fn then_void(&self, on_fulfilled: Option<Function>, on_rejected: Option<Function>) {
        let to_reaction =
            |f: Function| -> Reaction { Box::new(move |v| f.call_one(v).map(drop)) };
        self.add_callback_entry(CallbackEntry {
            child: None,
            reactions: Reactions::Pair {
                on_fulfilled: on_fulfilled.map(to_reaction),
                on_rejected: on_rejected.map(to_reaction),
            },
        });
    }

    /// Runs `on_settled` once this promise settles, either way.
    ///
    /// No child promise is produced and the outcome is not visible to the
    /// callback. An `Err` from it is reported as an uncaught error.
    pub fn then_always<F>(&self, on_settled: F)
    where
        F: FnOnce() -> Result<(), Value> + 'static,
    {
        self.add_callback_entry(CallbackEntry {
            child: None,
            reactions: Reactions::Always(Box::new(on_settled)),
        });
    }

    /// Requests cancellation.
    ///
    /// Only effective while Pending. The rejection happens from the run
    /// queue. A promise that is its parent's only dependent cancels the
    /// parent instead, so cancellation climbs single-consumer chains; with
    /// siblings present only this branch is rejected.
    pub fn cancel(&self, message: Option<&str>) {
        if self.state() != PromiseState::Pending {
            return;
        }
        let reason = Value::from(JsError::cancellation(
            message.unwrap_or(DEFAULT_CANCEL_MESSAGE),
        ));
        let promise = self.clone();
        scheduler::schedule(move || {
            promise.cancel_internal(reason);
            Ok(())
        });
    }

    fn cancel_internal(&self, reason: Value) {
        if self.state() != PromiseState::Pending {
            return;
        }
        let parent = self.take_parent();
        match parent {
            Some(parent) => parent.cancel_child(self, reason),
            None => self.resolve_inner(PromiseState::Rejected, reason),
        }
    }

    fn cancel_child(&self, child: &Promise, reason: Value) {
        let (position, dependents) = {
            let inner = self.inner.borrow();
            let mut dependents = 0;
            let mut position = None;
            for (index, entry) in inner.callback_entries.iter().enumerate() {
                if entry.is_always() {
                    continue;
                }
                dependents += 1;
                if entry.child.as_ref().is_some_and(|c| c.ptr_eq(child)) {
                    position = Some(index);
                }
                if position.is_some() && dependents > 1 {
                    break;
                }
            }
            (position, dependents)
        };

        let Some(position) = position else {
            child.resolve_inner(PromiseState::Rejected, reason);
            return;
        };

        if self.state() == PromiseState::Pending && dependents == 1 {
            debug!("cancelling sole dependent; propagating to parent");
            self.cancel_internal(reason);
        } else {
            let entry = self.inner.borrow_mut().callback_entries.remove(position);
            if let Some(entry) = entry {
                debug!(dependents, "cancelling one branch");
                self.execute_callback(entry, PromiseState::Rejected, reason);
            }
        }
    }

    /// The resolution algorithm shared by resolve, reject and unblocking.
    pub(crate) fn resolve_inner(&self, state: PromiseState, value: Value) {
        if self.state() != PromiseState::Pending {
            return;
        }

        let (state, value) = if self.is_same_as(&value) {
            (
                PromiseState::Rejected,
                Value::from(JsError::type_error("Promise cannot resolve to itself")),
            )
        } else {
            (state, value)
        };

        self.inner.borrow_mut().state = PromiseState::Blocked;
        let (unblock_fulfill, unblock_reject) = self.unblocking_functions();
        if thenable::maybe_then(&value, &unblock_fulfill, &unblock_reject) {
            trace!("promise blocked on thenable");
            return;
        }

        {
            let mut inner = self.inner.borrow_mut();
            inner.result = Some(value.clone());
            inner.state = state;
            inner.parent = None;
        }
        trace!(?state, "promise settled");
        self.schedule_callbacks();

        if state == PromiseState::Rejected && !value.is_cancellation() {
            rejection::add_unhandled_rejection(self, value);
        }
    }

    fn unblock(&self, state: PromiseState, value: Value) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.state != PromiseState::Blocked {
                return;
            }
            inner.state = PromiseState::Pending;
        }
        self.resolve_inner(state, value);
    }

    fn resolving_functions(&self) -> (Function, Function) {
        let promise = self.clone();
        let resolve = Function::new(move |args| {
            promise.resolve_inner(PromiseState::Fulfilled, arg(args, 0));
            Ok(Value::Undefined)
        });
        let promise = self.clone();
        let reject = Function::new(move |args| {
            promise.resolve_inner(PromiseState::Rejected, arg(args, 0));
            Ok(Value::Undefined)
        });
        (resolve, reject)
    }

    fn unblocking_functions(&self) -> (Function, Function) {
        let promise = self.clone();
        let fulfill = Function::new(move |args| {
            promise.unblock(PromiseState::Fulfilled, arg(args, 0));
            Ok(Value::Undefined)
        });
        let promise = self.clone();
        let reject = Function::new(move |args| {
            promise.unblock(PromiseState::Rejected, arg(args, 0));
            Ok(Value::Undefined)
        });
        (fulfill, reject)
    }

    fn is_same_as(&self, value: &Value) -> bool {
        Promise::from_value(value).is_some_and(|other| other.ptr_eq(self))
    }

    fn add_callback_entry(&self, entry: CallbackEntry) {
        let needs_flush = {
            let mut inner = self.inner.borrow_mut();
            let settled = matches!(
                inner.state,
                PromiseState::Fulfilled | PromiseState::Rejected
            );
            let was_empty = inner.callback_entries.is_empty();
            inner.callback_entries.push_back(entry);
            settled && was_empty
        };
        if needs_flush {
            self.schedule_callbacks();
        }
    }

    fn schedule_callbacks(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.executing {
                return;
            }
            inner.executing = true;
        }
        let promise = self.clone();
        scheduler::schedule(move || {
            promise.execute_callbacks();
            Ok(())
        });
    }

    fn execute_callbacks(&self) {
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                inner.callback_entries.pop_front().map(|entry| {
                    let result = inner.result.clone().unwrap_or(Value::Undefined);
                    (entry, inner.state, result)
                })
            };
            let Some((entry, state, result)) = next else {
                break;
            };
            self.execute_callback(entry, state, result);
        }
        self.inner.borrow_mut().executing = false;
    }

    fn execute_callback(&self, entry: CallbackEntry, state: PromiseState, result: Value) {
        if state == PromiseState::Rejected && entry.observes_rejection() {
            rejection::remove_unhandled_rejection(self);
        }
        if let Some(child) = &entry.child {
            child.inner.borrow_mut().parent = None;
        }
        if let Err(thrown) = entry.invoke(state, result) {
            scheduler::report_uncaught(thrown);
        }
    }

    fn take_parent(&self) -> Option<Promise> {
        let parent = self.inner.borrow_mut().parent.take()?;
        parent.upgrade().map(|inner| Promise { inner })
    }

    pub(crate) fn parent(&self) -> Option<Promise> {
        let inner = self.inner.borrow();
        let parent = inner.parent.as_ref()?;
        parent.upgrade().map(|inner| Promise { inner })
    }

    pub(crate) fn replace_rejection_watch(&self, watch: RejectionWatch) -> RejectionWatch {
        std::mem::replace(&mut self.inner.borrow_mut().rejection_watch, watch)
    }
}

impl Thenable for Promise {
    fn then(&self, on_fulfilled: Function, on_rejected: Function) -> Result<(), Value> {
        self.then_void(Some(on_fulfilled), Some(on_rejected));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn identity(&self) -> *const () {
        Rc::as_ptr(&self.inner) as *const ()
    }
}

impl From<Promise> for Value {
    fn from(promise: Promise) -> Self {
        Value::Thenable(Rc::new(promise))
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Promise")
                .field("state", &inner.state)
                .field("result", &inner.result)
                .field("callbacks", &inner.callback_entries.len())
                .finish(),
            Err(_) => write!(f, "Promise {{ <busy> }}"),
        }
    }
}

/// A pending promise plus the functions that settle it.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Promise, PromiseState};
/// use core_types::Value;
///
/// let resolver = Promise::with_resolver();
/// resolver.resolve(Value::from("done"));
/// resolver.reject(Value::from("ignored"));
/// assert_eq!(resolver.promise().state(), PromiseState::Fulfilled);
/// ```
#[derive(Debug, Clone)]
pub struct Resolver {
    promise: Promise,
    resolve: Function,
    reject: Function,
}

impl Resolver {
    /// The promise this resolver settles.
    pub fn promise(&self) -> &Promise {
        &self.promise
    }

    /// Resolves the promise; values that are thenables are adopted.
    pub fn resolve(&self, value: impl Into<Value>) {
        // Resolving functions never throw.
        let _ = self.resolve.call_one(value.into());
    }

    /// Rejects the promise.
    pub fn reject(&self, reason: impl Into<Value>) {
        // Resolving functions never throw.
        let _ = self.reject.call_one(reason.into());
    }

    /// The resolve and reject functions, for handing to foreign code.
    pub fn functions(&self) -> (Function, Function) {
        (self.resolve.clone(), self.reject.clone())
    }
}
