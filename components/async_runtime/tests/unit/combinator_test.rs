//! Unit tests for Promise combinators

use super::{run, setup, CallsBackTwice};
use async_runtime::{Promise, PromiseState};
use core_types::Value;

fn pending() -> (async_runtime::Resolver, Value) {
    let resolver = Promise::with_resolver();
    let value = Value::from(resolver.promise().clone());
    (resolver, value)
}

#[test]
fn resolve_and_reject_settle_immediately() {
    setup();
    let fulfilled = Promise::resolve(Value::Smi(1));
    let rejected = Promise::reject(Value::from("no"));
    assert_eq!(fulfilled.state(), PromiseState::Fulfilled);
    assert_eq!(rejected.state(), PromiseState::Rejected);
    rejected.catch(core_types::Function::noop());
    run();
}

#[test]
fn all_preserves_input_order() {
    setup();
    let (first, first_value) = pending();
    let (second, second_value) = pending();
    let all = Promise::all(vec![first_value, second_value]);

    second.resolve(Value::Smi(2));
    run();
    assert_eq!(all.state(), PromiseState::Pending);

    first.resolve(Value::Smi(1));
    run();
    assert_eq!(
        all.result(),
        Some(Value::Array(vec![Value::Smi(1), Value::Smi(2)]))
    );
}

#[test]
fn all_accepts_plain_values() {
    setup();
    let all = Promise::all(vec![
        Value::Smi(1),
        Promise::resolve(Value::from("x")).into(),
        Value::Null,
    ]);
    run();
    assert_eq!(
        all.result(),
        Some(Value::Array(vec![Value::Smi(1), Value::from("x"), Value::Null]))
    );
}

#[test]
fn all_rejects_with_first_rejection() {
    setup();
    let (slow, slow_value) = pending();
    let (failing, failing_value) = pending();
    let all = Promise::all(vec![slow_value, failing_value]);
    all.catch(core_types::Function::noop());

    failing.reject(Value::from("bad"));
    run();
    assert_eq!(all.state(), PromiseState::Rejected);
    assert_eq!(all.result(), Some(Value::from("bad")));

    slow.resolve(Value::Smi(1));
    run();
    assert_eq!(all.result(), Some(Value::from("bad")));
    assert_eq!(slow.promise().state(), PromiseState::Fulfilled);
}

#[test]
fn all_counts_each_input_once() {
    setup();
    let (pending_input, pending_value) = pending();
    let all = Promise::all(vec![CallsBackTwice::value(1, 2), pending_value]);
    run();
    assert_eq!(all.state(), PromiseState::Pending);

    pending_input.resolve(Value::Smi(3));
    run();
    assert_eq!(
        all.result(),
        Some(Value::Array(vec![Value::Smi(1), Value::Smi(3)]))
    );
}

#[test]
fn all_of_nothing_is_empty_array() {
    setup();
    let all = Promise::all(Vec::new());
    assert_eq!(all.result(), Some(Value::Array(vec![])));
}

#[test]
fn race_of_nothing_is_undefined() {
    setup();
    let race = Promise::race(Vec::new());
    assert_eq!(race.state(), PromiseState::Fulfilled);
    assert_eq!(race.result(), Some(Value::Undefined));
}

#[test]
fn race_settles_with_first_to_settle() {
    setup();
    let (slow, slow_value) = pending();
    let (fast, fast_value) = pending();
    let race = Promise::race(vec![slow_value, fast_value]);
    race.catch(core_types::Function::noop());

    fast.reject(Value::from("fast"));
    run();
    slow.resolve(Value::from("slow"));
    run();

    assert_eq!(race.state(), PromiseState::Rejected);
    assert_eq!(race.result(), Some(Value::from("fast")));
}

#[test]
fn race_with_plain_value_fulfills() {
    setup();
    let (_never, never_value) = pending();
    let race = Promise::race(vec![never_value, Value::Smi(5)]);
    run();
    assert_eq!(race.result(), Some(Value::Smi(5)));
}

#[test]
fn first_fulfilled_skips_rejections() {
    setup();
    let (a, a_value) = pending();
    let (b, b_value) = pending();
    let first = Promise::first_fulfilled(vec![a_value, b_value]);

    a.reject(Value::from("a"));
    run();
    assert_eq!(first.state(), PromiseState::Pending);

    b.resolve(Value::from("b"));
    run();
    assert_eq!(first.result(), Some(Value::from("b")));
}

#[test]
fn first_fulfilled_rejects_with_all_reasons_in_input_order() {
    setup();
    let (a, a_value) = pending();
    let (b, b_value) = pending();
    let first = Promise::first_fulfilled(vec![a_value, b_value]);
    first.catch(core_types::Function::noop());

    b.reject(Value::from("b"));
    run();
    a.reject(Value::from("a"));
    run();

    assert_eq!(first.state(), PromiseState::Rejected);
    assert_eq!(
        first.result(),
        Some(Value::Array(vec![Value::from("a"), Value::from("b")]))
    );
}

#[test]
fn all_settled_counts_each_input_once() {
    setup();
    let (pending_input, pending_value) = pending();
    let settled = Promise::all_settled(vec![CallsBackTwice::value("a", "b"), pending_value]);
    run();
    assert_eq!(settled.state(), PromiseState::Pending);

    pending_input.resolve(Value::Null);
    run();
    let Some(Value::Array(outcomes)) = settled.result() else {
        panic!("expected an array, got {:?}", settled.result());
    };
    assert_eq!(outcomes[0].get("value"), Value::from("a"));
    assert_eq!(outcomes[1].get("value"), Value::Null);
}

#[test]
fn first_fulfilled_of_nothing_is_undefined() {
    setup();
    let first = Promise::first_fulfilled(Vec::new());
    assert_eq!(first.result(), Some(Value::Undefined));
}

#[test]
fn all_settled_reports_each_outcome() {
    setup();
    let settled = Promise::all_settled(vec![
        Promise::resolve(Value::Smi(1)).into(),
        Promise::reject(Value::from("r")).into(),
    ]);
    run();

    let Some(Value::Array(outcomes)) = settled.result() else {
        panic!("expected an array, got {:?}", settled.result());
    };
    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].get("fulfilled"), Value::Boolean(true));
    assert_eq!(outcomes[0].get("value"), Value::Smi(1));
    assert_eq!(outcomes[1].get("fulfilled"), Value::Boolean(false));
    assert_eq!(outcomes[1].get("reason"), Value::from("r"));
    assert_eq!(outcomes[1].get("value"), Value::Undefined);
    assert!(async_runtime::EventLoop::current()
        .take_uncaught_errors()
        .is_empty());
}
