//! Integration test suite for the promise runtime
//!
//! Tests here drive `core_types` and `async_runtime` together through the
//! host event loop, the way an embedder would. The helpers below model a
//! timer-backed transport.

use async_runtime::{EventLoop, Promise, Task};
use core_types::Value;
use std::time::Duration;
use tracing::debug;

/// Re-export components for test convenience
pub mod components {
    pub use async_runtime;
    pub use core_types;
}

/// A promise that fulfills with `value` once `delay` has elapsed on the
/// current event loop.
pub fn delayed(delay: Duration, value: impl Into<Value>) -> Promise {
    let value = value.into();
    Promise::new(move |resolve, _| {
        EventLoop::current().set_timeout(
            delay,
            Task::new(move || resolve.call_one(value).map(drop)),
        );
        Ok(())
    })
}

/// A promise that rejects with `reason` once `delay` has elapsed.
pub fn failing(delay: Duration, reason: impl Into<Value>) -> Promise {
    let reason = reason.into();
    Promise::new(move |_, reject| {
        EventLoop::current().set_timeout(
            delay,
            Task::new(move || reject.call_one(reason).map(drop)),
        );
        Ok(())
    })
}

/// Cancels `promise` with `message` unless it settles within `limit`.
///
/// The timer is disarmed as soon as the promise settles either way.
pub fn with_timeout(promise: &Promise, limit: Duration, message: &'static str) -> Promise {
    let event_loop = EventLoop::current();
    let target = promise.clone();
    let timer = event_loop.set_timeout(
        limit,
        Task::new(move || {
            debug!(?limit, "deadline passed");
            target.cancel(Some(message));
            Ok(())
        }),
    );
    promise.then_always(move || {
        event_loop.clear_timeout(timer);
        Ok(())
    });
    promise.clone()
}
