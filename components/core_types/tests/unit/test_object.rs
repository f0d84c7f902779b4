//! Unit tests for JsObject and Function

use core_types::{arg, Function, JsObject, Value};

#[test]
fn test_object_set_and_get() {
    let obj = JsObject::new();
    assert_eq!(obj.get("then"), Value::Undefined);
    let then = Function::noop();
    obj.set("then", Value::Function(then.clone()));
    assert!(matches!(obj.get("then"), Value::Function(f) if f.ptr_eq(&then)));
}

#[test]
fn test_object_from_pairs() {
    let obj = JsObject::from_pairs([
        ("fulfilled", Value::Boolean(false)),
        ("reason", Value::from("a")),
    ]);
    assert_eq!(obj.get("fulfilled"), Value::Boolean(false));
    assert_eq!(Value::Object(obj).get("reason"), Value::from("a"));
}

#[test]
fn test_object_is_shared_between_clones() {
    let obj = JsObject::new();
    let alias = obj.clone();
    alias.set("x", Value::Smi(1));
    assert_eq!(obj.get("x"), Value::Smi(1));
    assert!(obj.ptr_eq(&alias));
}

#[test]
fn test_function_throw_is_err() {
    let f = Function::new(|args| Err(arg(args, 0)));
    assert_eq!(f.call_one(Value::from("thrown")), Err(Value::from("thrown")));
}
