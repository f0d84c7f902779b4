//! Plain objects with named properties.

use crate::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// A shared, mutable property bag.
///
/// This is the shape foreign libraries use to hand over duck-typed
/// thenables: any object whose `then` property is a function.
///
/// # Examples
///
/// ```
/// use core_types::{JsObject, Value};
///
/// let obj = JsObject::new();
/// obj.set("fulfilled", Value::Boolean(true));
/// assert_eq!(obj.get("fulfilled"), Value::Boolean(true));
/// assert_eq!(obj.get("value"), Value::Undefined);
/// ```
#[derive(Clone, Default)]
pub struct JsObject {
    properties: Rc<RefCell<BTreeMap<String, Value>>>,
}

impl JsObject {
    /// Creates an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an object from `(key, value)` pairs.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let obj = Self::new();
        for (key, value) in pairs {
            obj.set(key, value);
        }
        obj
    }

    /// Reads a property, yielding `undefined` when absent.
    pub fn get(&self, key: &str) -> Value {
        self.properties
            .borrow()
            .get(key)
            .cloned()
            .unwrap_or(Value::Undefined)
    }

    /// Writes a property.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.properties.borrow_mut().insert(key.into(), value);
    }

    /// Returns true if both handles refer to the same object.
    pub fn ptr_eq(&self, other: &JsObject) -> bool {
        Rc::ptr_eq(&self.properties, &other.properties)
    }
}

impl fmt::Debug for JsObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.properties.try_borrow() {
            Ok(props) => f.debug_map().entries(props.iter()).finish(),
            Err(_) => write!(f, "{{ <borrowed> }}"),
        }
    }
}
