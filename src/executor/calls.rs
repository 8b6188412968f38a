//! Function invocation
//!
//! Every callable (source-defined, foreign, partial, pipe) goes through
//! `call_value`. Source-defined functions get a fresh frame on the call stack
//! for the duration of the body; nested and recursive calls are reentrant.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

use super::environment::{CallFrame, Environment, KeywordTable};
use super::errors::{EvalError, EvalResult};
use super::expressions::{evaluate, evaluate_all};
use super::foreign::{Arguments, ForeignError, ForeignFunction, ForeignKind, Invoker, LocalBoxFuture};
use super::types::{Callable, Node, UserFunction, Value};

/// Resolve a called name: decorators, then functions, then a callable variable
fn resolve_named(env: &Environment, name: &str) -> EvalResult {
    if let Some(decorated) = env.decorators.get(name) {
        return Ok(decorated.clone());
    }
    if let Some(function) = env.functions.get(name) {
        return Ok(Value::Callable(Callable::User(Rc::clone(function))));
    }
    match env.lookup(name) {
        Ok(value @ Value::Callable(_)) => Ok(value),
        _ => Err(EvalError::not_defined("function", name)),
    }
}

/// Evaluate a `FunctionRef` call site
pub async fn invoke_named(env: &mut Environment, name: &str, args: &[Node]) -> EvalResult {
    let callee = resolve_named(env, name)?;
    let positional = evaluate_all(args, env).await?;
    call_value(env, &callee, positional, IndexMap::new()).await
}

/// Invoke any value; non-callables fail with a TypeMismatchError
pub fn call_value<'a>(
    env: &'a mut Environment,
    callee: &'a Value,
    positional: Vec<Value>,
    keyword: IndexMap<String, Value>,
) -> LocalBoxFuture<'a, EvalResult> {
    Box::pin(async move {
        match callee {
            Value::Callable(callable) => call_callable(env, callable, positional, keyword).await,
            other => Err(EvalError::type_mismatch(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    })
}

fn call_callable<'a>(
    env: &'a mut Environment,
    callable: &'a Callable,
    positional: Vec<Value>,
    keyword: IndexMap<String, Value>,
) -> LocalBoxFuture<'a, EvalResult> {
    Box::pin(async move {
        match callable {
            Callable::User(function) => call_user(env, function, positional, keyword).await,

            Callable::Foreign(function) => call_foreign(env, function, positional, keyword).await,

            Callable::Partial { target, args } => {
                let mut combined = Vec::with_capacity(args.len() + positional.len());
                combined.extend(args.iter().cloned());
                combined.extend(positional);
                call_callable(env, target, combined, keyword).await
            }

            Callable::Pipe { first, then } => {
                let intermediate = call_callable(env, first, positional, keyword).await?;
                call_callable(env, then, vec![intermediate], IndexMap::new()).await
            }
        }
    })
}

/// Pair actual arguments with formal parameters
///
/// Positional arguments bind in order, keywords by name. Too few or too many
/// positional arguments is an ArityError.
fn bind_arguments(
    function: &UserFunction,
    positional: &[Value],
    keyword: IndexMap<String, Value>,
) -> EvalResult<HashMap<String, Value>> {
    let arity_error = |given: usize| EvalError::Arity {
        function: function.name.clone(),
        expected: function.params.len().to_string(),
        given,
    };

    if positional.len() > function.params.len() {
        return Err(arity_error(positional.len() + keyword.len()));
    }

    let mut bindings: HashMap<String, Value> = function
        .params
        .iter()
        .cloned()
        .zip(positional.iter().cloned())
        .collect();

    let given = positional.len() + keyword.len();
    for (name, value) in keyword {
        if !function.params.contains(&name) {
            return Err(EvalError::type_mismatch(format!(
                "{}() got an unexpected keyword argument '{}'",
                function.name, name
            )));
        }
        if bindings.contains_key(&name) {
            return Err(EvalError::type_mismatch(format!(
                "{}() got multiple values for argument '{}'",
                function.name, name
            )));
        }
        bindings.insert(name, value);
    }

    if bindings.len() < function.params.len() {
        return Err(arity_error(given));
    }
    Ok(bindings)
}

async fn call_user(
    env: &mut Environment,
    function: &Rc<UserFunction>,
    positional: Vec<Value>,
    keyword: IndexMap<String, Value>,
) -> EvalResult {
    let bindings = bind_arguments(function, &positional, keyword)?;
    debug!(function = %function.name, args = bindings.len(), depth = env.call_depth(), "invoke");

    let bound = function
        .params
        .iter()
        .filter_map(|param| bindings.get(param).cloned())
        .collect();
    env.record_invocation(KeywordTable::new(function.params.clone(), bound));
    env.push_frame(CallFrame {
        function: function.name.clone(),
        bindings,
    })?;

    let body = Rc::clone(&function.body);
    let result = evaluate(&body, env).await;
    env.pop_frame();
    result
}

/// Sync and reentrant foreign functions run inline; async ones are queued and
/// yield a Task
async fn call_foreign(
    env: &mut Environment,
    function: &ForeignFunction,
    positional: Vec<Value>,
    keyword: IndexMap<String, Value>,
) -> EvalResult {
    if !function.arity.accepts(positional.len()) {
        return Err(EvalError::Arity {
            function: function.qualified_name(),
            expected: function.arity.to_string(),
            given: positional.len(),
        });
    }

    let args = Arguments::new(positional, keyword);
    let failed = |err: ForeignError| EvalError::Foreign {
        function: function.qualified_name(),
        message: err.message,
    };
    match &function.kind {
        ForeignKind::Sync(func) => func(args).map_err(failed),
        ForeignKind::Reentrant(func) => func(Invoker::new(env), args).await.map_err(failed),
        ForeignKind::Async(func) => {
            let future = func(args);
            Ok(Value::Task(env.scheduler.spawn(function.qualified_name(), future)))
        }
    }
}
