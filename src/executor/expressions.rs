//! Expression evaluation
//!
//! `evaluate` is the central dispatcher: one exhaustive match over node kinds.
//! Expression rules live here; statement-like rules (blocks, assignment,
//! definitions, control flow, imports) are in `statements`.

use indexmap::IndexMap;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::debug;

use super::calls::invoke_named;
use super::environment::Environment;
use super::errors::{EvalError, EvalResult};
use super::foreign::{self, LocalBoxFuture};
use super::statements;
use super::types::{BinaryOpKind, DictKey, FileHandle, LiteralKind, Memo, Node, Value};
use crate::config::Dialect;

pub type EvalFuture<'a> = LocalBoxFuture<'a, EvalResult>;

/// Evaluate a node against the environment
///
/// Uses `Box::pin` for async recursion.
pub fn evaluate<'a>(node: &'a Node, env: &'a mut Environment) -> EvalFuture<'a> {
    Box::pin(async move {
        match node {
            Node::Literal { kind, memo } => eval_literal(kind, memo, env),

            Node::BinaryOp { op, left, right } => {
                let left = evaluate(left, env).await?;
                let right = evaluate(right, env).await?;
                binary_op(*op, &left, &right)
            }

            Node::Variable { name } => env.lookup(name),

            Node::Assignment { target, value } => {
                statements::eval_assignment(target, value, env).await
            }

            Node::Program(program) => statements::eval_program(program, env).await,

            Node::If {
                condition,
                body,
                elif_condition,
                elif_body,
                else_body,
            } => {
                statements::eval_if(
                    condition,
                    body,
                    elif_condition.as_deref(),
                    elif_body.as_deref(),
                    else_body.as_deref(),
                    env,
                )
                .await
            }

            Node::FunctionRef { name, args } => {
                invoke_named(env, name, args.as_deref().unwrap_or(&[])).await
            }

            Node::FunctionDef { name, params, body } => {
                statements::eval_function_def(name, params, body, env)
            }

            Node::Array { elements, memo } => eval_array(elements, memo, env).await,

            Node::Dict { entries, memo } => eval_dict(entries, memo, env).await,

            Node::Index { base, index } => {
                let base = evaluate(base, env).await?;
                let index = evaluate(index, env).await?;
                index_value(&base, &index)
            }

            Node::Import {
                symbol_path,
                relative_base,
                alias,
            } => foreign::import_module(
                env,
                symbol_path,
                relative_base.as_deref(),
                alias.as_deref(),
            ),

            Node::ForeignCall {
                module,
                function_name,
                positional_args,
                keyword_args,
                is_awaited,
            } => {
                foreign::foreign_call(
                    env,
                    module,
                    function_name,
                    positional_args,
                    keyword_args,
                    *is_awaited,
                )
                .await
            }

            Node::GetAttr {
                base,
                attribute_name,
            } => foreign::get_attr(env, base, attribute_name),

            Node::Decorated {
                decorator_owner,
                decorator_name,
                target,
                has_parens,
                positional_args,
                keyword_args,
            } => {
                statements::eval_decorated(
                    statements::DecoratorSite {
                        owner: decorator_owner,
                        name: decorator_name,
                        has_parens: *has_parens,
                        positional_args,
                        keyword_args,
                    },
                    target,
                    env,
                )
                .await
            }

            Node::Sleep { duration_seconds } => {
                statements::eval_sleep(duration_seconds, env).await
            }

            Node::OpenFile { path } => eval_open(path, env).await,

            Node::ReadFile { source, memo } => eval_read(source, memo, env).await,

            // Ordinary expression: no early exit from the enclosing block
            Node::Return { value } => evaluate(value, env).await,

            Node::Print { value } => {
                let value = evaluate(value, env).await?;
                env.write_line(&value.to_string())?;
                Ok(Value::None)
            }
        }
    })
}

/// Evaluate nodes left to right
pub async fn evaluate_all(nodes: &[Node], env: &mut Environment) -> EvalResult<Vec<Value>> {
    let mut values = Vec::with_capacity(nodes.len());
    for node in nodes {
        values.push(evaluate(node, env).await?);
    }
    Ok(values)
}

/// Evaluate keyword arguments in written order
pub async fn evaluate_keywords(
    entries: &[(String, Node)],
    env: &mut Environment,
) -> EvalResult<IndexMap<String, Value>> {
    let mut values = IndexMap::with_capacity(entries.len());
    for (name, node) in entries {
        let value = evaluate(node, env).await?;
        values.insert(name.clone(), value);
    }
    Ok(values)
}

/* ===================== Literals ===================== */

fn eval_literal(kind: &LiteralKind, memo: &Memo, env: &Environment) -> EvalResult {
    if let Some(value) = memo.get() {
        return Ok(value);
    }

    let value = match kind {
        LiteralKind::Number(text) => {
            let parsed = text.trim().parse::<i64>().map_err(|_| EvalError::InvalidLiteral {
                text: text.clone(),
            })?;
            Value::Int(parsed)
        }
        LiteralKind::String(raw) => match env.dialect() {
            Dialect::Mellow => Value::Str(strip_quotes(raw).to_string()),
            Dialect::Capn => Value::Str(raw.clone()),
        },
        LiteralKind::Boolean(b) => Value::Bool(*b),
    };

    Ok(memo.store(value))
}

/// Remove every leading and trailing quote character
fn strip_quotes(raw: &str) -> &str {
    raw.trim_matches(|c| c == '"' || c == '\'')
}

/* ===================== Operators ===================== */

pub fn binary_op(op: BinaryOpKind, left: &Value, right: &Value) -> EvalResult {
    match op {
        BinaryOpKind::Sum => add(left, right),
        BinaryOpKind::Sub => arithmetic(op, left, right, |a, b| a.checked_sub(b), |a, b| a - b),
        BinaryOpKind::Mul => multiply(left, right),
        BinaryOpKind::Div => divide(left, right),
        BinaryOpKind::Equal => Ok(Value::Bool(left == right)),
        BinaryOpKind::NotEqual => Ok(Value::Bool(left != right)),
        BinaryOpKind::GreaterThan => compare(op, left, right).map(|o| Value::Bool(o.is_gt())),
        BinaryOpKind::LessThan => compare(op, left, right).map(|o| Value::Bool(o.is_lt())),
        BinaryOpKind::GreaterEqual => compare(op, left, right).map(|o| Value::Bool(o.is_ge())),
        BinaryOpKind::LessEqual => compare(op, left, right).map(|o| Value::Bool(o.is_le())),
    }
}

fn unsupported(op: BinaryOpKind, left: &Value, right: &Value) -> EvalError {
    EvalError::type_mismatch(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(),
        right.type_name()
    ))
}

fn overflow(op: BinaryOpKind) -> EvalError {
    EvalError::type_mismatch(format!("integer overflow in '{}'", op.symbol()))
}

fn arithmetic(
    op: BinaryOpKind,
    left: &Value,
    right: &Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> EvalResult {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b).map(Value::Int).ok_or_else(|| overflow(op)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(float_op(a, b))),
            _ => Err(unsupported(op, left, right)),
        },
    }
}

fn add(left: &Value, right: &Value) -> EvalResult {
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::Array(a), Value::Array(b)) => {
            Ok(Value::array(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => arithmetic(BinaryOpKind::Sum, left, right, |a, b| a.checked_add(b), |a, b| a + b),
    }
}

/// Longest string or array a repetition may produce
const MAX_REPEAT_LEN: usize = 1 << 28;

/// Repetition count for `len` elements, rejected before anything is allocated
fn repeat_count(len: usize, n: i64) -> EvalResult<usize> {
    let times = usize::try_from(n.max(0)).map_err(|_| overflow(BinaryOpKind::Mul))?;
    match len.checked_mul(times) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(times),
        _ => Err(EvalError::type_mismatch(format!(
            "repeated sequence too long: {} item(s) * {}",
            len, n
        ))),
    }
}

fn multiply(left: &Value, right: &Value) -> EvalResult {
    match (left, right) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            Ok(Value::Str(s.repeat(repeat_count(s.len(), *n)?)))
        }
        (Value::Array(items), Value::Int(n)) | (Value::Int(n), Value::Array(items)) => {
            let times = repeat_count(items.len(), *n)?;
            let mut repeated = Vec::with_capacity(items.len() * times);
            for _ in 0..times {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::array(repeated))
        }
        _ => arithmetic(BinaryOpKind::Mul, left, right, |a, b| a.checked_mul(b), |a, b| a * b),
    }
}

/// Real division: integer operands may produce a fractional result
fn divide(left: &Value, right: &Value) -> EvalResult {
    match (left.as_f64(), right.as_f64()) {
        (Some(_), Some(b)) if b == 0.0 => Err(EvalError::ZeroDivision),
        (Some(a), Some(b)) => Ok(Value::Float(a / b)),
        _ => Err(unsupported(BinaryOpKind::Div, left, right)),
    }
}

fn compare(op: BinaryOpKind, left: &Value, right: &Value) -> EvalResult<std::cmp::Ordering> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| {
                EvalError::type_mismatch(format!("cannot order {} and {}", a, b))
            }),
            _ => Err(EvalError::type_mismatch(format!(
                "'{}' not supported between instances of '{}' and '{}'",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ))),
        },
    }
}

/* ===================== Collections ===================== */

async fn eval_array(elements: &[Node], memo: &Memo, env: &mut Environment) -> EvalResult {
    if let Some(value) = memo.get() {
        return Ok(value);
    }
    let values = evaluate_all(elements, env).await?;
    Ok(memo.store(Value::array(values)))
}

async fn eval_dict(entries: &[(Node, Node)], memo: &Memo, env: &mut Environment) -> EvalResult {
    if let Some(value) = memo.get() {
        return Ok(value);
    }
    let mut map = IndexMap::with_capacity(entries.len());
    for (key_node, value_node) in entries {
        let key = evaluate(key_node, env).await?;
        let key = DictKey::from_value(&key).ok_or_else(|| {
            EvalError::type_mismatch(format!("unhashable type: '{}'", key.type_name()))
        })?;
        let value = evaluate(value_node, env).await?;
        map.insert(key, value);
    }
    Ok(memo.store(Value::dict(map)))
}

fn normalize_index(index: i64, len: usize) -> EvalResult<usize> {
    let resolved = if index < 0 { index + len as i64 } else { index };
    if resolved < 0 || resolved as usize >= len {
        return Err(EvalError::IndexOutOfRange { index, len });
    }
    Ok(resolved as usize)
}

pub fn index_value(base: &Value, index: &Value) -> EvalResult {
    match (base, index) {
        (Value::Array(items), Value::Int(i)) => {
            let position = normalize_index(*i, items.len())?;
            Ok(items[position].clone())
        }
        (Value::Array(_), other) => Err(EvalError::type_mismatch(format!(
            "array indices must be integers, not {}",
            other.type_name()
        ))),
        (Value::Str(s), Value::Int(i)) => {
            let chars: Vec<char> = s.chars().collect();
            let position = normalize_index(*i, chars.len())?;
            Ok(Value::Str(chars[position].to_string()))
        }
        (Value::Dict(entries), key) => {
            let lookup = DictKey::from_value(key).ok_or_else(|| {
                EvalError::type_mismatch(format!("unhashable type: '{}'", key.type_name()))
            })?;
            entries
                .get(&lookup)
                .cloned()
                .ok_or_else(|| EvalError::not_defined("key", key.repr()))
        }
        (other, _) => Err(EvalError::type_mismatch(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/* ===================== Files ===================== */

fn path_of(value: &Value) -> EvalResult<PathBuf> {
    match value {
        Value::Str(s) => Ok(PathBuf::from(strip_quotes(s))),
        Value::File(handle) => Ok(handle.path.clone()),
        other => Err(EvalError::type_mismatch(format!(
            "expected a path or file, not {}",
            other.type_name()
        ))),
    }
}

async fn eval_open(path: &Node, env: &mut Environment) -> EvalResult {
    let path = path_of(&evaluate(path, env).await?)?;
    let metadata = tokio::fs::metadata(&path)
        .await
        .map_err(|err| EvalError::io(path.display().to_string(), err))?;
    if metadata.is_dir() {
        return Err(EvalError::io(
            path.display().to_string(),
            std::io::Error::new(std::io::ErrorKind::Other, "is a directory"),
        ));
    }
    debug!(path = %path.display(), "open");
    Ok(Value::File(Rc::new(FileHandle { path })))
}

async fn eval_read(source: &Node, memo: &Memo, env: &mut Environment) -> EvalResult {
    if let Some(value) = memo.get() {
        return Ok(value);
    }
    let path = path_of(&evaluate(source, env).await?)?;
    let contents = tokio::fs::read_to_string(&path)
        .await
        .map_err(|err| EvalError::io(path.display().to_string(), err))?;
    debug!(path = %path.display(), bytes = contents.len(), "read");
    Ok(memo.store(Value::Str(contents)))
}
