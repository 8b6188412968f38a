//! Statement-like node handlers
//!
//! Blocks, assignment, conditionals, definitions, decorators and sleep. Every
//! handler still produces a value: the language treats these as expressions.

use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

use super::calls::call_value;
use super::environment::Environment;
use super::errors::{EvalError, EvalResult};
use super::expressions::{evaluate, evaluate_all, evaluate_keywords};
use super::foreign::resolve_foreign;
use super::types::{Callable, Node, Program, UserFunction, Value};

/// Evaluate statements in original order; the last value is the result
pub async fn eval_program(program: &Program, env: &mut Environment) -> EvalResult {
    let mut result = Value::None;
    for statement in program.statements() {
        result = evaluate(statement, env).await?;
    }
    Ok(result)
}

/// Store the evaluated right-hand side under the target's name
pub async fn eval_assignment(target: &Node, value: &Node, env: &mut Environment) -> EvalResult {
    let name = match target {
        Node::Variable { name } => name,
        other => {
            return Err(EvalError::InvalidAssignmentTarget {
                found: other.kind_name().to_string(),
            })
        }
    };
    let value = evaluate(value, env).await?;
    env.assign(name, value.clone());
    Ok(value)
}

/// Branch selection: condition, then elif (only with an elif body), then else
///
/// `else` is reached when the condition is false and the elif pair is absent
/// or its condition is false. No branch taken yields `None`.
pub async fn eval_if(
    condition: &Node,
    body: &Node,
    elif_condition: Option<&Node>,
    elif_body: Option<&Node>,
    else_body: Option<&Node>,
    env: &mut Environment,
) -> EvalResult {
    if evaluate(condition, env).await?.is_truthy() {
        return evaluate(body, env).await;
    }

    if let (Some(elif_condition), Some(elif_body)) = (elif_condition, elif_body) {
        if evaluate(elif_condition, env).await?.is_truthy() {
            return evaluate(elif_body, env).await;
        }
    }

    match else_body {
        Some(else_body) => evaluate(else_body, env).await,
        None => Ok(Value::None),
    }
}

fn param_names(function: &str, params: &[Node]) -> EvalResult<Vec<String>> {
    params
        .iter()
        .map(|param| match param {
            Node::Variable { name } => Ok(name.clone()),
            other => Err(EvalError::InvalidAssignmentTarget {
                found: format!("{} in parameter list of {}()", other.kind_name(), function),
            }),
        })
        .collect()
}

fn build_function(name: &str, params: &[Node], body: &Rc<Node>) -> EvalResult<Rc<UserFunction>> {
    Ok(Rc::new(UserFunction {
        name: name.to_string(),
        params: param_names(name, params)?,
        body: Rc::clone(body),
    }))
}

/// Register a function; the body is not evaluated
pub fn eval_function_def(
    name: &str,
    params: &[Node],
    body: &Rc<Node>,
    env: &mut Environment,
) -> EvalResult {
    let function = build_function(name, params, body)?;
    debug!(function = %name, params = function.params.len(), "define");
    env.decorators.remove(name);
    env.functions.insert(name.to_string(), function);
    Ok(Value::Str(name.to_string()))
}

/// Decorator reference and arguments as written at the definition site
pub struct DecoratorSite<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub has_parens: bool,
    pub positional_args: &'a [Node],
    pub keyword_args: &'a [(String, Node)],
}

/// Apply a foreign decorator to a function definition
///
/// With parentheses the decorator is first called with its arguments and the
/// result is applied to the wrapped function.
pub async fn eval_decorated(site: DecoratorSite<'_>, target: &Node, env: &mut Environment) -> EvalResult {
    let function = match target {
        Node::FunctionDef { name, params, body } => build_function(name, params, body)?,
        other => {
            return Err(EvalError::type_mismatch(format!(
                "decorators apply to function definitions, not {}",
                other.kind_name()
            )))
        }
    };

    let decorator = match resolve_foreign(env, site.owner, site.name) {
        Ok(value) => value,
        Err(EvalError::NotDefined { .. }) => return Err(EvalError::attribute(site.owner, site.name)),
        Err(err) => return Err(err),
    };

    let decorator = if site.has_parens {
        let positional = evaluate_all(site.positional_args, env).await?;
        let keyword = evaluate_keywords(site.keyword_args, env).await?;
        call_value(env, &decorator, positional, keyword).await?
    } else {
        decorator
    };

    let name = function.name.clone();
    let wrapper = Value::Callable(Callable::User(function));
    let decorated = call_value(env, &decorator, vec![wrapper], Default::default()).await?;

    debug!(function = %name, decorator = %format!("{}.{}", site.owner, site.name), "decorate");
    env.functions.remove(&name);
    env.decorators.insert(name, decorated.clone());
    Ok(decorated)
}

/// Suspend for the given number of seconds
///
/// Queued tasks run to completion first, in issue order.
pub async fn eval_sleep(duration: &Node, env: &mut Environment) -> EvalResult {
    let value = evaluate(duration, env).await?;
    let seconds = value.as_f64().ok_or_else(|| {
        EvalError::type_mismatch(format!("sleep() duration must be a number, not {}", value.type_name()))
    })?;
    let delay = match Duration::try_from_secs_f64(seconds) {
        Ok(delay) => delay,
        Err(_) => {
            return Err(EvalError::type_mismatch(format!(
                "sleep() duration must be a non-negative number of seconds in range, got {}",
                value
            )))
        }
    };
    env.scheduler.run_pending().await;
    tokio::time::sleep(delay).await;
    Ok(Value::None)
}
