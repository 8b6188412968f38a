//! `string` module

use crate::executor::foreign::{Arguments, Arity, ForeignError, ForeignFunction, Module};
use crate::executor::types::Value;

const MODULE: &str = "string";

pub fn module() -> Module {
    Module::new(MODULE)
        .function(ForeignFunction::sync(MODULE, "upper", Arity::Exact(1), |args| {
            Ok(Value::str(args.string(0)?.to_uppercase()))
        }))
        .function(ForeignFunction::sync(MODULE, "lower", Arity::Exact(1), |args| {
            Ok(Value::str(args.string(0)?.to_lowercase()))
        }))
        .function(ForeignFunction::sync(MODULE, "len", Arity::Exact(1), len))
        .function(ForeignFunction::sync(MODULE, "join", Arity::Exact(2), join))
}

/// string.len(x) - characters of a string, elements of an array or dict
pub fn len(args: Arguments) -> Result<Value, ForeignError> {
    let count = match args.value(0)? {
        Value::Str(s) => s.chars().count(),
        Value::Array(items) => items.len(),
        Value::Dict(entries) => entries.len(),
        other => {
            return Err(ForeignError::new(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(count as i64))
}

/// string.join(separator, items)
pub fn join(args: Arguments) -> Result<Value, ForeignError> {
    let separator = args.string(0)?;
    let items = match args.value(1)? {
        Value::Array(items) => items,
        other => {
            return Err(ForeignError::new(format!(
                "can only join an array, not {}",
                other.type_name()
            )))
        }
    };
    let parts: Vec<String> = items.iter().map(Value::to_string).collect();
    Ok(Value::str(parts.join(separator)))
}
