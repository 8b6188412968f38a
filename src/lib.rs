pub mod cli;
pub mod config;
pub mod executor;

// Re-export main types
pub use config::{Dialect, InterpreterConfig};
pub use executor::{load_program, run_program, EvalError, Interpreter, Node, Value};
