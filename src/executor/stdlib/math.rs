//! `math` module

use crate::executor::foreign::{Arguments, Arity, ForeignError, ForeignFunction, Module};
use crate::executor::types::Value;

const MODULE: &str = "math";

pub fn module() -> Module {
    Module::new(MODULE)
        .function(ForeignFunction::sync(MODULE, "sqrt", Arity::Exact(1), sqrt))
        .function(ForeignFunction::sync(MODULE, "pow", Arity::Exact(2), pow))
        .function(ForeignFunction::sync(MODULE, "floor", Arity::Exact(1), floor))
        .function(ForeignFunction::sync(MODULE, "ceil", Arity::Exact(1), ceil))
        .function(ForeignFunction::sync(MODULE, "abs", Arity::Exact(1), abs))
        .constant("pi", Value::Float(std::f64::consts::PI))
        .constant("e", Value::Float(std::f64::consts::E))
}

/// math.sqrt(x) - always a float
pub fn sqrt(args: Arguments) -> Result<Value, ForeignError> {
    let x = args.number(0)?;
    if x < 0.0 {
        return Err(ForeignError::new("math domain error"));
    }
    Ok(Value::Float(x.sqrt()))
}

pub fn pow(args: Arguments) -> Result<Value, ForeignError> {
    Ok(Value::Float(args.number(0)?.powf(args.number(1)?)))
}

fn to_int(x: f64) -> Result<Value, ForeignError> {
    if !x.is_finite() || x.abs() > i64::MAX as f64 {
        return Err(ForeignError::new(format!("cannot convert {} to integer", x)));
    }
    Ok(Value::Int(x as i64))
}

pub fn floor(args: Arguments) -> Result<Value, ForeignError> {
    match args.value(0)? {
        Value::Int(n) => Ok(Value::Int(*n)),
        _ => to_int(args.number(0)?.floor()),
    }
}

pub fn ceil(args: Arguments) -> Result<Value, ForeignError> {
    match args.value(0)? {
        Value::Int(n) => Ok(Value::Int(*n)),
        _ => to_int(args.number(0)?.ceil()),
    }
}

/// math.abs(x) - keeps the argument's numeric type
pub fn abs(args: Arguments) -> Result<Value, ForeignError> {
    match args.value(0)? {
        Value::Int(n) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| ForeignError::new("integer overflow")),
        _ => Ok(Value::Float(args.number(0)?.abs())),
    }
}
