//! # Executor - AST Evaluation Engine
//!
//! Evaluates a parsed program against an explicit [`Environment`].
//!
//! ## Core Principles
//!
//! 1. **Tree-walking evaluation**: `evaluate` matches exhaustively on node kind
//! 2. **Explicit context**: the environment and scheduler are parameters, not globals
//! 3. **Call stack**: each invocation pushes its own frame, so recursion works
//! 4. **Single thread**: the only suspension point is awaiting a foreign task
//!
//! ## Running a program
//!
//! ```no_run
//! use mellow::executor::{run_program, Node};
//! use mellow::InterpreterConfig;
//!
//! let program = Node::block([Node::print(Node::number(3))]);
//! run_program(&program, InterpreterConfig::default(), std::io::stdout()).unwrap();
//! ```

pub mod calls;
pub mod environment;
pub mod errors;
pub mod expressions;
pub mod foreign;
pub mod scheduler;
pub mod statements;
pub mod stdlib;
pub mod types;

#[cfg(test)]
mod tests;

use std::io::Write;

use crate::config::InterpreterConfig;

// Re-export commonly used items
pub use calls::call_value;
pub use environment::Environment;
pub use errors::{EvalError, EvalResult};
pub use expressions::evaluate;
pub use foreign::{Arguments, Arity, ForeignError, ForeignFunction, ForeignRegistry, Invoker, Module};
pub use types::{BinaryOpKind, Callable, DictKey, LiteralKind, Node, Program, Value};

/// Decode a serialized AST produced by an external parser
pub fn load_program(json: &str) -> EvalResult<Node> {
    serde_json::from_str(json).map_err(|err| EvalError::ParseTermination {
        message: err.to_string(),
    })
}

/// Embeddable interpreter owning one environment
///
/// Host async functions may call `spawn_local`, so await `run` inside a
/// `tokio::task::LocalSet`.
pub struct Interpreter {
    env: Environment,
}

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        let registry = stdlib::registry(&config.modules);
        Self {
            env: Environment::new(config, registry),
        }
    }

    pub fn with_output(mut self, output: impl Write + 'static) -> Self {
        self.env.set_output(Box::new(output));
        self
    }

    /// Register a host module; it becomes importable by its path
    pub fn register_module(&mut self, module: Module) {
        self.env.registry.register(module);
    }

    /// Evaluate the program, then join every task still outstanding
    pub async fn run(&mut self, program: &Node) -> EvalResult {
        let result = evaluate(program, &mut self.env).await?;
        self.env.scheduler.drain().await?;
        Ok(result)
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.env
    }
}

/// Run an interpreter to completion on a fresh current-thread runtime
pub fn block_on_interpreter(interpreter: &mut Interpreter, program: &Node) -> EvalResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| EvalError::io("<runtime>", err))?;
    let local = tokio::task::LocalSet::new();
    local.block_on(&runtime, interpreter.run(program))
}

/// Evaluate a program with a fresh environment, writing output to `output`
pub fn run_program(
    program: &Node,
    config: InterpreterConfig,
    output: impl Write + 'static,
) -> EvalResult {
    let mut interpreter = Interpreter::new(config).with_output(output);
    block_on_interpreter(&mut interpreter, program)
}
