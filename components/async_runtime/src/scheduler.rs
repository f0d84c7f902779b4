//! The async run queue.
//!
//! Promise callbacks never run inside the call that settled the promise.
//! They are queued here and run together in a single flush task on the
//! current thread's [`EventLoop`].

use crate::event_loop::EventLoop;
use crate::task_queue::{MicroTask, MicrotaskQueue, Task};
use core_types::Value;
use std::cell::{Cell, RefCell};
use tracing::trace;

#[derive(Default)]
struct RunQueue {
    pending: RefCell<MicrotaskQueue>,
    flush_scheduled: Cell<bool>,
}

thread_local! {
    static RUN_QUEUE: RunQueue = RunQueue::default();
}

/// Queues `callback` to run after the current call stack unwinds.
///
/// Callbacks scheduled in the same turn run in FIFO order, including ones
/// scheduled by other callbacks while a flush is in progress. At most one
/// flush task is outstanding on the event loop at any time. A callback that
/// returns `Err` is reported through [`report_uncaught`]; the rest of the
/// batch still runs.
///
/// # Examples
///
/// ```
/// use async_runtime::{scheduler, EventLoop};
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let ran = Rc::new(Cell::new(false));
/// let r = ran.clone();
/// scheduler::schedule(move || {
///     r.set(true);
///     Ok(())
/// });
/// assert!(!ran.get());
///
/// EventLoop::current().run_until_idle();
/// assert!(ran.get());
/// ```
pub fn schedule<F>(callback: F)
where
    F: FnOnce() -> Result<(), Value> + 'static,
{
    let needs_flush = RUN_QUEUE.with(|queue| {
        queue.pending.borrow_mut().enqueue(MicroTask::new(callback));
        !queue.flush_scheduled.replace(true)
    });
    if needs_flush {
        EventLoop::current().enqueue_task(Task::new(flush));
    }
}

/// Surfaces `reason` as an uncaught error on the host loop.
///
/// The report happens in a fresh task so it never unwinds through the
/// caller's stack.
pub fn report_uncaught(reason: Value) {
    EventLoop::current().enqueue_task(Task::new(move || Err(reason)));
}

/// Number of callbacks waiting for the next flush.
pub fn pending_len() -> usize {
    RUN_QUEUE.with(|queue| queue.pending.borrow().len())
}

/// Drops every pending callback and forgets any scheduled flush.
///
/// A flush task already on the event loop becomes a no-op.
pub fn reset_queue() {
    RUN_QUEUE.with(|queue| {
        queue.pending.borrow_mut().clear();
        queue.flush_scheduled.set(false);
    });
}

fn flush() -> Result<(), Value> {
    let mut ran = 0usize;
    loop {
        let batch = RUN_QUEUE.with(|queue| queue.pending.borrow_mut().take_batch());
        if batch.is_empty() {
            break;
        }
        for microtask in batch {
            ran += 1;
            if let Err(reason) = microtask.run() {
                report_uncaught(reason);
            }
        }
    }
    RUN_QUEUE.with(|queue| queue.flush_scheduled.set(false));
    trace!(callbacks = ran, "run queue flushed");
    Ok(())
}
