//! `asyncio` module: awaitable helpers

use crate::executor::foreign::{Arguments, Arity, ForeignError, ForeignFunction, Module};
use crate::executor::types::Value;

use super::time::duration;

const MODULE: &str = "asyncio";

pub fn module() -> Module {
    Module::new(MODULE)
        .function(ForeignFunction::asynchronous(MODULE, "sleep", Arity::Range(1, 2), sleep))
        .function(ForeignFunction::asynchronous(MODULE, "echo", Arity::Exact(1), echo))
}

/// asyncio.sleep(seconds, result=None) - resolves to `result` after the delay
pub async fn sleep(args: Arguments) -> Result<Value, ForeignError> {
    let delay = duration(&args, 0)?;
    let result = args.param(1, "result").cloned().unwrap_or(Value::None);
    tokio::time::sleep(delay).await;
    Ok(result)
}

/// asyncio.echo(value) - yields to the scheduler once, then resolves to `value`
pub async fn echo(args: Arguments) -> Result<Value, ForeignError> {
    let value = args.value(0)?.clone();
    tokio::task::yield_now().await;
    Ok(value)
}
