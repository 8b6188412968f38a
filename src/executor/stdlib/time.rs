//! `time` module

use chrono::Utc;
use std::time::Duration;

use crate::executor::foreign::{Arguments, Arity, ForeignError, ForeignFunction, Module};
use crate::executor::types::Value;

const MODULE: &str = "time";

pub fn module() -> Module {
    Module::new(MODULE)
        .function(ForeignFunction::sync(MODULE, "time", Arity::Exact(0), |_| {
            Ok(Value::Float(Utc::now().timestamp_millis() as f64 / 1000.0))
        }))
        .function(ForeignFunction::asynchronous(MODULE, "sleep", Arity::Exact(1), sleep))
}

pub(crate) fn duration(args: &Arguments, index: usize) -> Result<Duration, ForeignError> {
    let seconds = args.number(index)?;
    Duration::try_from_secs_f64(seconds).map_err(|_| {
        ForeignError::new(format!(
            "sleep length must be non-negative and in range, got {}",
            seconds
        ))
    })
}

/// time.sleep(seconds) - async, resolves to None
pub async fn sleep(args: Arguments) -> Result<Value, ForeignError> {
    tokio::time::sleep(duration(&args, 0)?).await;
    Ok(Value::None)
}
