//! Host event loop.
//!
//! This module provides the loop that runs host tasks and timers. The async
//! run queue arranges its flushes here, and delayed unhandled-rejection
//! checks arm timers here.
//!
//! Time is virtual: the clock only moves when the host calls
//! [`EventLoop::advance_by`] or [`EventLoop::run_until_done`], which keeps
//! timer-driven behavior deterministic.

use crate::task_queue::{Task, TaskQueue};
use core_types::Value;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;
use std::time::Duration;
use tracing::{error, trace};

/// Handle for a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Default)]
struct LoopState {
    tasks: TaskQueue,
    // Keyed by (deadline, id) so equal deadlines fire in creation order.
    timers: BTreeMap<(Duration, u64), Task>,
    deadlines: HashMap<u64, Duration>,
    now: Duration,
    next_timer: u64,
    uncaught: Vec<Value>,
}

/// The event loop.
///
/// Each iteration takes the oldest task from the task queue and runs it.
/// Timers become tasks once the virtual clock reaches their deadline.
/// A task that fails is an uncaught error: it is logged, retained for
/// [`EventLoop::take_uncaught_errors`], and the loop continues.
///
/// `EventLoop` is a cheap handle; clones share the same queues. Every thread
/// owns one loop, returned by [`EventLoop::current`], which is the loop the
/// promise machinery schedules onto.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Task};
/// use std::time::Duration;
///
/// let event_loop = EventLoop::new();
/// event_loop.set_timeout(Duration::from_millis(10), Task::new(|| Ok(())));
/// event_loop.enqueue_task(Task::new(|| Ok(())));
///
/// assert_eq!(event_loop.run_until_idle(), 1);
/// assert_eq!(event_loop.run_until_done(), 1);
/// assert_eq!(event_loop.now(), Duration::from_millis(10));
/// ```
#[derive(Clone, Default)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
}

thread_local! {
    static CURRENT: EventLoop = EventLoop::new();
}

impl EventLoop {
    /// Creates a new EventLoop with empty queues and the clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current thread's event loop.
    pub fn current() -> Self {
        CURRENT.with(EventLoop::clone)
    }

    /// Adds a task to the task queue.
    pub fn enqueue_task(&self, task: Task) {
        self.state.borrow_mut().tasks.enqueue(task);
    }

    /// Arms a timer that enqueues `task` once `delay` has elapsed.
    pub fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = state.next_timer;
        state.next_timer += 1;
        let deadline = state.now + delay;
        state.timers.insert((deadline, id), task);
        state.deadlines.insert(id, deadline);
        trace!(timer = id, ?deadline, "timer armed");
        TimerId(id)
    }

    /// Disarms a timer. Returns false if it already fired or was cleared.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let mut state = self.state.borrow_mut();
        match state.deadlines.remove(&id.0) {
            Some(deadline) => state.timers.remove(&(deadline, id.0)).is_some(),
            None => false,
        }
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Returns true if the task queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.state.borrow().tasks.is_empty()
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Runs one task if one is queued. Returns whether a task ran.
    pub fn process_one_cycle(&self) -> bool {
        // The borrow must end before the task runs; tasks enqueue more work.
        let task = self.state.borrow_mut().tasks.dequeue();
        match task {
            Some(task) => {
                self.run_task(task);
                true
            }
            None => false,
        }
    }

    /// Runs tasks, including timers already due, until the queue is empty.
    ///
    /// Returns the number of tasks run. The clock does not move.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            self.promote_due_timers();
            if !self.process_one_cycle() {
                break;
            }
            ran += 1;
        }
        ran
    }

    /// Moves the clock forward by `delta`, firing timers in deadline order.
    ///
    /// Tasks are drained after each timer, so timers armed by earlier timers
    /// still fire if they fall inside the window. Returns tasks run.
    pub fn advance_by(&self, delta: Duration) -> usize {
        let target = self.now() + delta;
        let mut ran = self.run_until_idle();
        while let Some(deadline) = self.next_deadline().filter(|d| *d <= target) {
            self.state.borrow_mut().now = deadline;
            ran += self.run_until_idle();
        }
        self.state.borrow_mut().now = target;
        ran + self.run_until_idle()
    }

    /// Runs until no task and no timer remains, jumping the clock to each
    /// timer's deadline. Returns tasks run.
    pub fn run_until_done(&self) -> usize {
        let mut ran = self.run_until_idle();
        while let Some(deadline) = self.next_deadline() {
            {
                let mut state = self.state.borrow_mut();
                if deadline > state.now {
                    state.now = deadline;
                }
            }
            ran += self.run_until_idle();
        }
        ran
    }

    /// Drains the uncaught errors recorded so far, oldest first.
    pub fn take_uncaught_errors(&self) -> Vec<Value> {
        std::mem::take(&mut self.state.borrow_mut().uncaught)
    }

    fn next_deadline(&self) -> Option<Duration> {
        self.state
            .borrow()
            .timers
            .keys()
            .next()
            .map(|(deadline, _)| *deadline)
    }

    fn promote_due_timers(&self) {
        let mut state = self.state.borrow_mut();
        let now = state.now;
        while let Some(entry) = state.timers.first_entry() {
            let (deadline, id) = *entry.key();
            if deadline > now {
                break;
            }
            let task = entry.remove();
            state.deadlines.remove(&id);
            state.tasks.enqueue(task);
            trace!(timer = id, "timer fired");
        }
    }

    fn run_task(&self, task: Task) {
        if let Err(reason) = task.run() {
            error!(%reason, "uncaught exception");
            self.state.borrow_mut().uncaught.push(reason);
        }
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("EventLoop")
                .field("tasks", &state.tasks.len())
                .field("timers", &state.timers.len())
                .field("now", &state.now)
                .finish(),
            Err(_) => write!(f, "EventLoop {{ <running> }}"),
        }
    }
}
