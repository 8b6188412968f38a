//! Type definitions for the executor
//!
//! - AST nodes (Node, Program, operators, literals)
//! - Runtime values (Value, Callable, DictKey)

pub mod ast;
pub mod values;

pub use ast::{BinaryOpKind, LiteralKind, Memo, Node, Program};
pub use values::{Callable, DictKey, FileHandle, UserFunction, Value};
