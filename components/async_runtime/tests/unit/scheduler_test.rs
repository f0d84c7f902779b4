//! Unit tests for the async run queue

use super::setup;
use async_runtime::{scheduler, EventLoop, Promise, Task};
use core_types::{Function, Value};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn one_flush_task_per_turn() {
    setup();
    for _ in 0..5 {
        scheduler::schedule(|| Ok(()));
    }
    assert_eq!(scheduler::pending_len(), 5);
    assert_eq!(EventLoop::current().run_until_idle(), 1);
    assert_eq!(scheduler::pending_len(), 0);
}

#[test]
fn schedule_after_flush_arranges_new_flush() {
    setup();
    let event_loop = EventLoop::current();
    scheduler::schedule(|| Ok(()));
    event_loop.run_until_idle();

    let ran = Rc::new(RefCell::new(false));
    let r = ran.clone();
    scheduler::schedule(move || {
        *r.borrow_mut() = true;
        Ok(())
    });
    assert_eq!(event_loop.run_until_idle(), 1);
    assert!(*ran.borrow());
}

#[test]
fn host_task_queued_first_runs_before_flush() {
    setup();
    let event_loop = EventLoop::current();
    let order = Rc::new(RefCell::new(vec![]));

    let o = order.clone();
    event_loop.enqueue_task(Task::new(move || {
        o.borrow_mut().push("task");
        Ok(())
    }));
    let o = order.clone();
    scheduler::schedule(move || {
        o.borrow_mut().push("callback");
        Ok(())
    });

    event_loop.run_until_idle();
    assert_eq!(*order.borrow(), vec!["task", "callback"]);
}

#[test]
fn synchronously_resolved_chain_flushes_in_one_task() {
    setup();
    let promise = Promise::resolve(Value::Smi(0));
    let mut tail = promise;
    for _ in 0..10 {
        tail = tail.then(
            Some(Function::unary(|v| match v {
                Value::Smi(n) => Ok(Value::Smi(n + 1)),
                other => Ok(other),
            })),
            None,
        );
    }

    assert_eq!(EventLoop::current().run_until_idle(), 1);
    assert_eq!(tail.result(), Some(Value::Smi(10)));
}

#[test]
fn report_uncaught_surfaces_on_host_loop() {
    setup();
    scheduler::report_uncaught(Value::from("oops"));
    let event_loop = EventLoop::current();
    assert!(event_loop.take_uncaught_errors().is_empty());
    event_loop.run_until_idle();
    assert_eq!(event_loop.take_uncaught_errors(), vec![Value::from("oops")]);
}
