//! `functools` module: decorators and higher-order helpers
//!
//! These return callable values built from `Callable::Partial` and
//! `Callable::Pipe`, which the evaluator invokes through `call_value`.
//! `trace` and `apply` call back into the evaluator through an `Invoker`.

use std::rc::Rc;
use tracing::debug;

use crate::executor::foreign::{Arguments, Arity, ForeignError, ForeignFunction, Invoker, LocalBoxFuture, Module};
use crate::executor::types::{Callable, Value};

const MODULE: &str = "functools";

pub fn module() -> Module {
    Module::new(MODULE)
        .function(ForeignFunction::sync(MODULE, "identity", Arity::Exact(1), identity))
        .function(ForeignFunction::sync(MODULE, "pipe", Arity::Exact(1), pipe))
        .function(ForeignFunction::sync(MODULE, "partial", Arity::AtLeast(1), partial))
        .function(ForeignFunction::sync(MODULE, "_pipe_apply", Arity::Exact(2), pipe_apply))
        .function(ForeignFunction::sync(MODULE, "trace", Arity::Exact(1), trace))
        .function(ForeignFunction::reentrant(MODULE, "apply", Arity::AtLeast(1), apply))
}

/// functools.identity(f) - decorator returning the function unchanged
pub fn identity(args: Arguments) -> Result<Value, ForeignError> {
    Ok(Value::Callable(args.callable(0)?.clone()))
}

/// functools.pipe(g) - decorator factory; the decorated function's result is
/// passed through `g`
pub fn pipe(args: Arguments) -> Result<Value, ForeignError> {
    let then = args.callable(0)?.clone();
    let apply = ForeignFunction::sync(MODULE, "_pipe_apply", Arity::Exact(2), pipe_apply);
    Ok(Value::Callable(Callable::Partial {
        target: Rc::new(Callable::Foreign(Rc::new(apply))),
        args: Rc::new(vec![Value::Callable(then)]),
    }))
}

/// Second stage of `pipe`: (g, f) -> f then g
fn pipe_apply(args: Arguments) -> Result<Value, ForeignError> {
    let then = args.callable(0)?.clone();
    let first = args.callable(1)?.clone();
    Ok(Value::Callable(Callable::Pipe {
        first: Rc::new(first),
        then: Rc::new(then),
    }))
}

/// functools.partial(f, *args)
pub fn partial(args: Arguments) -> Result<Value, ForeignError> {
    let target = args.callable(0)?.clone();
    let bound = args.positional[1..].to_vec();
    Ok(Value::Callable(Callable::Partial {
        target: Rc::new(target),
        args: Rc::new(bound),
    }))
}

/// functools.trace(f) - decorator logging each call and its result
pub fn trace(args: Arguments) -> Result<Value, ForeignError> {
    let target = Value::Callable(args.callable(0)?.clone());
    let name = format!("trace({})", args.callable(0)?.name());
    let wrapper = ForeignFunction::reentrant(MODULE, &name, Arity::AtLeast(0), move |mut invoker, args| {
        let target = target.clone();
        Box::pin(async move {
            debug!(function = %target, args = args.len(), "traced call");
            let result = invoker
                .call_with_keywords(&target, args.positional, args.keyword)
                .await?;
            debug!(function = %target, result = %result, "traced return");
            Ok(result)
        })
    });
    Ok(wrapper.into_value())
}

/// functools.apply(f, *args) - call `f` with the remaining arguments
pub fn apply<'a>(mut invoker: Invoker<'a>, args: Arguments) -> LocalBoxFuture<'a, Result<Value, ForeignError>> {
    Box::pin(async move {
        let target = args.value(0)?.clone();
        invoker.call(&target, args.positional[1..].to_vec()).await
    })
}
