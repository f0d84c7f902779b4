//! Cancellable promises and the async run queue they are scheduled on.
//!
//! # Overview
//!
//! - [`Promise`] - Promises/A+ promise with cancellation
//! - [`scheduler`] - The async run queue: deferred, FIFO callback execution
//! - [`EventLoop`] - Host loop running tasks and timers on a virtual clock
//! - [`PromiseConfig`] - Unhandled-rejection policy and handler
//!
//! Everything here is single-threaded. Each thread has its own event loop,
//! run queue and configuration; promises must stay on the thread that
//! created them.
//!
//! # Examples
//!
//! ## Chaining
//!
//! ```
//! use async_runtime::{EventLoop, Promise};
//! use core_types::{Function, JsError, Value};
//!
//! let result = Promise::resolve(Value::Smi(5))
//!     .then(Some(Function::unary(|_| Err(JsError::error("boom").into()))), None)
//!     .catch(Function::unary(|e| Ok(e.get("message"))));
//!
//! EventLoop::current().run_until_idle();
//! assert_eq!(result.result(), Some(Value::from("boom")));
//! ```
//!
//! ## Cancellation
//!
//! ```
//! use async_runtime::{EventLoop, Promise, PromiseState};
//!
//! let request = Promise::with_resolver();
//! let response = request.promise().then(None, None);
//! response.cancel(Some("timed out"));
//!
//! EventLoop::current().run_until_idle();
//! assert_eq!(request.promise().state(), PromiseState::Rejected);
//! assert!(response.result().is_some_and(|r| r.is_cancellation()));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod combinators;
pub mod config;
pub mod event_loop;
pub mod promise;
mod rejection;
pub mod scheduler;
pub mod task_queue;
mod thenable;

// Re-export main types at crate root
pub use config::{
    configure, reset_unhandled_rejection_handler, set_unhandled_rejection_delay,
    set_unhandled_rejection_handler, ConfigError, PromiseConfig, RejectionPolicy,
};
pub use event_loop::{EventLoop, TimerId};
pub use promise::{Promise, PromiseState, Resolver, DEFAULT_CANCEL_MESSAGE};
pub use task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue};
pub use thenable::{is_thenable, FirstCallGuard};
