//! Task and microtask queue management.
//!
//! Tasks are host-level units of work (timer callbacks, flushes of the run
//! queue, uncaught error reports). Microtasks are the callbacks drained by
//! the async run queue. Both are FIFO.

use core_types::Value;
use std::collections::VecDeque;
use std::fmt;

/// A task to be executed by the event loop.
///
/// An `Err` result is an uncaught throw; the event loop records it and keeps
/// going.
pub struct Task {
    callback: Box<dyn FnOnce() -> Result<(), Value>>,
}

impl Task {
    /// Creates a new Task from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), Value> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the task.
    pub fn run(self) -> Result<(), Value> {
        (self.callback)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task {{ ... }}")
    }
}

/// A callback waiting in the async run queue.
pub struct MicroTask {
    callback: Box<dyn FnOnce() -> Result<(), Value>>,
}

impl MicroTask {
    /// Creates a new MicroTask from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), Value> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the microtask.
    pub fn run(self) -> Result<(), Value> {
        (self.callback)()
    }
}

impl fmt::Debug for MicroTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MicroTask {{ ... }}")
    }
}

/// A queue for tasks.
#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<Task>,
}

impl TaskQueue {
    /// Creates a new empty TaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a task to the end of the queue.
    pub fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Removes and returns the next task from the queue.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of tasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// A queue for microtasks.
///
/// The run queue drains it by swapping the whole batch out with
/// [`MicrotaskQueue::take_batch`], so callbacks enqueued while a batch runs
/// land in the next batch instead of invalidating the current one.
#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    queue: VecDeque<MicroTask>,
}

impl MicrotaskQueue {
    /// Creates a new empty MicrotaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a microtask to the end of the queue.
    pub fn enqueue(&mut self, microtask: MicroTask) {
        self.queue.push_back(microtask);
    }

    /// Takes every queued microtask, leaving the queue empty.
    pub fn take_batch(&mut self) -> VecDeque<MicroTask> {
        std::mem::take(&mut self.queue)
    }

    /// Drops every queued microtask.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of microtasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}
