//! Promise constructors and combinators.
//!
//! Combinators accept any sequence of values. Thenables among them are
//! adopted; plain values count as already fulfilled and are delivered from
//! the run queue. Inputs that lose a race are ignored, not cancelled.

use crate::promise::Promise;
use crate::thenable::maybe_then_void;
use core_types::{Function, JsObject, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Bookkeeping shared by the per-input callbacks of a combinator.
struct Slots {
    values: RefCell<Vec<Value>>,
    remaining: Cell<usize>,
}

impl Slots {
    fn new(len: usize) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::new(vec![Value::Undefined; len]),
            remaining: Cell::new(len),
        })
    }

    /// Stores `value` at `index`; returns the full list once every slot is in.
    fn fill(&self, index: usize, value: Value) -> Option<Vec<Value>> {
        self.values.borrow_mut()[index] = value;
        let remaining = self.remaining.get().saturating_sub(1);
        self.remaining.set(remaining);
        (remaining == 0).then(|| self.values.borrow().clone())
    }
}

impl Promise {
    /// A promise resolved with `value`.
    ///
    /// A promise passed in is returned as-is; other thenables are adopted.
    pub fn resolve(value: impl Into<Value>) -> Promise {
        let value = value.into();
        if let Some(promise) = Promise::from_value(&value) {
            return promise;
        }
        Promise::new(move |resolve, _| resolve.call_one(value).map(drop))
    }

    /// A promise rejected with `reason`.
    pub fn reject(reason: impl Into<Value>) -> Promise {
        let reason = reason.into();
        Promise::new(move |_, reject| reject.call_one(reason).map(drop))
    }

    /// Settles like the first input to settle. Empty input fulfills with
    /// `undefined`.
    pub fn race<I>(values: I) -> Promise
    where
        I: IntoIterator<Item = Value>,
    {
        let values: Vec<Value> = values.into_iter().collect();
        Promise::new(move |resolve, reject| {
            if values.is_empty() {
                resolve.call_one(Value::Undefined)?;
            }
            for value in values {
                maybe_then_void(value, resolve.clone(), reject.clone());
            }
            Ok(())
        })
    }

    /// Fulfills with every input's value, in input order, once all fulfill.
    /// Rejects with the first rejection. Empty input fulfills with `[]`.
    pub fn all<I>(values: I) -> Promise
    where
        I: IntoIterator<Item = Value>,
    {
        let values: Vec<Value> = values.into_iter().collect();
        Promise::new(move |resolve, reject| {
            if values.is_empty() {
                resolve.call_one(Value::Array(vec![]))?;
                return Ok(());
            }
            let slots = Slots::new(values.len());
            for (index, value) in values.into_iter().enumerate() {
                let slots = slots.clone();
                let resolve = resolve.clone();
                let on_fulfilled = Function::unary(move |v| {
                    if let Some(all) = slots.fill(index, v) {
                        resolve.call_one(Value::Array(all))?;
                    }
                    Ok(Value::Undefined)
                });
                maybe_then_void(value, on_fulfilled, reject.clone());
            }
            Ok(())
        })
    }

    /// Fulfills with one `{fulfilled, value}` or `{fulfilled, reason}` object
    /// per input once all have settled. Never rejects.
    pub fn all_settled<I>(values: I) -> Promise
    where
        I: IntoIterator<Item = Value>,
    {
        let values: Vec<Value> = values.into_iter().collect();
        Promise::new(move |resolve, _| {
            if values.is_empty() {
                resolve.call_one(Value::Array(vec![]))?;
                return Ok(());
            }
            let slots = Slots::new(values.len());
            for (index, value) in values.into_iter().enumerate() {
                let settle = |fulfilled: bool| {
                    let slots = slots.clone();
                    let resolve = resolve.clone();
                    let key = if fulfilled { "value" } else { "reason" };
                    Function::unary(move |v| {
                        let outcome = JsObject::from_pairs([
                            ("fulfilled", Value::Boolean(fulfilled)),
                            (key, v),
                        ]);
                        if let Some(all) = slots.fill(index, Value::Object(outcome)) {
                            resolve.call_one(Value::Array(all))?;
                        }
                        Ok(Value::Undefined)
                    })
                };
                maybe_then_void(value, settle(true), settle(false));
            }
            Ok(())
        })
    }

    /// Fulfills with the first fulfilled value. Rejects only when every input
    /// rejects, with the reasons in input order. Empty input fulfills with
    /// `undefined`.
    pub fn first_fulfilled<I>(values: I) -> Promise
    where
        I: IntoIterator<Item = Value>,
    {
        let values: Vec<Value> = values.into_iter().collect();
        Promise::new(move |resolve, reject| {
            if values.is_empty() {
                resolve.call_one(Value::Undefined)?;
                return Ok(());
            }
            let slots = Slots::new(values.len());
            for (index, value) in values.into_iter().enumerate() {
                let slots = slots.clone();
                let reject = reject.clone();
                let on_rejected = Function::unary(move |reason| {
                    if let Some(reasons) = slots.fill(index, reason) {
                        reject.call_one(Value::Array(reasons))?;
                    }
                    Ok(Value::Undefined)
                });
                maybe_then_void(value, resolve.clone(), on_rejected);
            }
            Ok(())
        })
    }
}
