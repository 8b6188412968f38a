//! Tests for the uniform `call_value` operation

use std::rc::Rc;

use indexmap::IndexMap;

use super::helpers::op;
use crate::config::InterpreterConfig;
use crate::executor::types::UserFunction;
use crate::executor::{
    call_value, errors, BinaryOpKind, Callable, EvalResult, Interpreter, Node, Value,
};

/// fn sub(a, b) = a - b
fn sub() -> Value {
    Value::Callable(Callable::User(Rc::new(UserFunction {
        name: "sub".to_string(),
        params: vec!["a".to_string(), "b".to_string()],
        body: Rc::new(op(BinaryOpKind::Sub, Node::var("a"), Node::var("b"))),
    })))
}

fn call(callee: &Value, positional: Vec<Value>, keyword: IndexMap<String, Value>) -> EvalResult {
    let mut interpreter = Interpreter::new(InterpreterConfig::default());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    runtime.block_on(call_value(
        interpreter.environment_mut(),
        callee,
        positional,
        keyword,
    ))
}

fn keywords(pairs: &[(&str, i64)]) -> IndexMap<String, Value> {
    pairs
        .iter()
        .map(|(name, v)| (name.to_string(), Value::Int(*v)))
        .collect()
}

#[test]
fn test_positional_binding() {
    let result = call(&sub(), vec![Value::Int(10), Value::Int(3)], IndexMap::new());
    assert_eq!(result.unwrap(), Value::Int(7));
}

#[test]
fn test_keyword_binding() {
    let result = call(&sub(), vec![], keywords(&[("b", 3), ("a", 10)]));
    assert_eq!(result.unwrap(), Value::Int(7));
}

#[test]
fn test_mixed_binding() {
    let result = call(&sub(), vec![Value::Int(10)], keywords(&[("b", 4)]));
    assert_eq!(result.unwrap(), Value::Int(6));
}

#[test]
fn test_unknown_keyword() {
    let err = call(&sub(), vec![Value::Int(1)], keywords(&[("c", 2)])).unwrap_err();

    assert_eq!(err.kind(), errors::TYPE_MISMATCH);
    assert!(err.to_string().contains("unexpected keyword argument 'c'"));
}

#[test]
fn test_keyword_repeats_positional() {
    let err = call(&sub(), vec![Value::Int(1)], keywords(&[("a", 2)])).unwrap_err();
    assert!(err.to_string().contains("multiple values for argument 'a'"));
}

#[test]
fn test_missing_argument_is_arity_error() {
    let err = call(&sub(), vec![], keywords(&[("a", 2)])).unwrap_err();
    assert_eq!(err.kind(), errors::ARITY);
}

#[test]
fn test_partial_prepends_bound_args() {
    let partial = Value::Callable(Callable::Partial {
        target: Rc::new(match sub() {
            Value::Callable(c) => c,
            _ => unreachable!(),
        }),
        args: Rc::new(vec![Value::Int(100)]),
    });

    let result = call(&partial, vec![Value::Int(1)], IndexMap::new());
    assert_eq!(result.unwrap(), Value::Int(99));
}

#[test]
fn test_calling_non_callable_value() {
    let err = call(&Value::Int(1), vec![], IndexMap::new()).unwrap_err();

    assert_eq!(err.kind(), errors::TYPE_MISMATCH);
    assert!(err.to_string().contains("'int' object is not callable"));
}

#[test]
fn test_sync_foreign_arity_checked() {
    let sqrt = crate::executor::stdlib::math::module()
        .get("sqrt")
        .cloned()
        .unwrap();

    let err = call(&sqrt, vec![], IndexMap::new()).unwrap_err();
    assert_eq!(err.kind(), errors::ARITY);
    assert!(err.to_string().contains("math.sqrt()"));

    let result = call(&sqrt, vec![Value::Int(9)], IndexMap::new());
    assert_eq!(result.unwrap(), Value::Float(3.0));
}

#[test]
fn test_keyword_bound_params_visible_after_call() {
    let mut interpreter = Interpreter::new(InterpreterConfig::default());
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let result = runtime.block_on(call_value(
        interpreter.environment_mut(),
        &sub(),
        vec![Value::Int(10)],
        keywords(&[("b", 4)]),
    ));

    assert_eq!(result.unwrap(), Value::Int(6));
    let env = interpreter.environment();
    assert_eq!(env.lookup("a").unwrap(), Value::Int(10));
    assert_eq!(env.lookup("b").unwrap(), Value::Int(4));
}
