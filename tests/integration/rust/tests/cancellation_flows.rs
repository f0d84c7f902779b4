//! Cancellation across timer-backed chains
//!
//! Models a request with an abort hook, a parse step layered on it, and a
//! deadline that cancels the outermost consumer.

use async_runtime::{scheduler, EventLoop, Promise, PromiseState};
use core_types::{ErrorKind, Function, JsError, Value};
use integration_tests::{delayed, with_timeout};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn setup() -> EventLoop {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    scheduler::reset_queue();
    let event_loop = EventLoop::current();
    event_loop.run_until_done();
    event_loop.take_uncaught_errors();
    event_loop
}

/// A request that answers after `latency` and records whether it was
/// aborted by a cancellation.
fn request(latency: Duration) -> (Promise, Rc<Cell<bool>>) {
    let aborted = Rc::new(Cell::new(false));
    let promise = delayed(latency, "payload");
    let (a, watched) = (aborted.clone(), promise.clone());
    promise.then_always(move || {
        if watched.result().is_some_and(|r| r.is_cancellation()) {
            a.set(true);
        }
        Ok(())
    });
    (promise, aborted)
}

fn parse(response: &Promise) -> Promise {
    response.then(
        Some(Function::unary(|body| Ok(Value::from(format!("parsed {body}"))))),
        None,
    )
}

#[test]
fn deadline_cancels_whole_single_consumer_chain() {
    let event_loop = setup();
    let (response, aborted) = request(ms(500));
    let parsed = with_timeout(&parse(&response), ms(100), "Request timed out");

    event_loop.advance_by(ms(100));

    assert!(aborted.get());
    assert_eq!(response.state(), PromiseState::Rejected);
    assert_eq!(parsed.state(), PromiseState::Rejected);
    assert_eq!(
        parsed.result(),
        Some(Value::from(JsError::new(
            ErrorKind::CancellationError,
            "Request timed out"
        )))
    );

    event_loop.run_until_done();
    assert!(event_loop.take_uncaught_errors().is_empty());
}

#[test]
fn fast_response_disarms_deadline() {
    let event_loop = setup();
    let (response, aborted) = request(ms(20));
    let parsed = with_timeout(&parse(&response), ms(100), "Request timed out");

    event_loop.advance_by(ms(20));
    assert_eq!(parsed.result(), Some(Value::from("parsed payload")));
    assert_eq!(event_loop.pending_timers(), 0);

    event_loop.run_until_done();
    assert!(!aborted.get());
    assert_eq!(event_loop.now(), ms(20));
}

#[test]
fn shared_response_survives_one_consumer_timing_out() {
    let event_loop = setup();
    let (response, aborted) = request(ms(200));
    let impatient = with_timeout(&parse(&response), ms(50), "gave up");
    let patient = parse(&response);

    event_loop.advance_by(ms(50));
    assert_eq!(impatient.state(), PromiseState::Rejected);
    assert_eq!(response.state(), PromiseState::Pending);

    event_loop.run_until_done();
    assert!(!aborted.get());
    assert_eq!(patient.result(), Some(Value::from("parsed payload")));
}

#[test]
fn catch_after_cancellation_keeps_chain_rejected() {
    let event_loop = setup();
    let (response, _aborted) = request(ms(100));
    let logged = Rc::new(Cell::new(0));
    let l = logged.clone();
    let guarded = parse(&response).catch(Function::unary(move |_| {
        l.set(l.get() + 1);
        Ok(Value::Undefined)
    }));

    guarded.cancel(None);
    event_loop.run_until_done();

    assert_eq!(logged.get(), 1);
    assert_eq!(guarded.state(), PromiseState::Rejected);
    assert!(guarded.result().is_some_and(|r| r.is_cancellation()));
}
