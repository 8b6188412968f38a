//! Test helpers for executor tests
//!
//! Programs are built directly from `Node` constructors and run on a fresh
//! interpreter whose output is captured in memory.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use crate::config::{Dialect, InterpreterConfig};
use crate::executor::{
    block_on_interpreter, BinaryOpKind, EvalError, EvalResult, Interpreter, Module, Node,
};

/// In-memory output sink shared between the interpreter and the test
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Outcome of one program run
pub struct Run {
    pub result: EvalResult,
    pub output: String,
    pub interpreter: Interpreter,
}

/// Run with the default config (Mellow dialect, every stdlib module)
pub fn run(program: Node) -> Run {
    run_with(program, InterpreterConfig::default(), Vec::new())
}

pub fn run_capn(program: Node) -> Run {
    let config = InterpreterConfig {
        dialect: Dialect::Capn,
        ..InterpreterConfig::default()
    };
    run_with(program, config, Vec::new())
}

/// Run with a custom config and extra host modules
pub fn run_with(program: Node, config: InterpreterConfig, modules: Vec<Module>) -> Run {
    let buffer = SharedBuffer::default();
    let mut interpreter = Interpreter::new(config).with_output(buffer.clone());
    for module in modules {
        interpreter.register_module(module);
    }
    let result = block_on_interpreter(&mut interpreter, &program);
    Run {
        result,
        output: buffer.contents(),
        interpreter,
    }
}

/// Output of a program that must succeed
pub fn output_of(program: Node) -> String {
    let run = run(program);
    if let Err(err) = &run.result {
        panic!("Program failed: {}", err);
    }
    run.output
}

/// Error of a program that must fail
pub fn error_of(program: Node) -> EvalError {
    match run(program).result {
        Ok(value) => panic!("Expected an error, got {:?}", value),
        Err(err) => err,
    }
}

/* ===================== Node Shorthands ===================== */

pub fn num(n: i64) -> Node {
    Node::number(n)
}

/// String literal as the parser hands it over, quotes included
pub fn text(s: &str) -> Node {
    Node::string(format!("'{}'", s))
}

pub fn op(kind: BinaryOpKind, left: Node, right: Node) -> Node {
    Node::binary(kind, left, right)
}

pub fn if_node(
    condition: Node,
    body: Node,
    elif: Option<(Node, Node)>,
    else_body: Option<Node>,
) -> Node {
    let (elif_condition, elif_body) = match elif {
        Some((c, b)) => (Some(Box::new(c)), Some(Box::new(b))),
        None => (None, None),
    };
    Node::If {
        condition: Box::new(condition),
        body: Box::new(body),
        elif_condition,
        elif_body,
        else_body: else_body.map(Box::new),
    }
}

pub fn decorated(owner: &str, name: &str, args: Option<Vec<Node>>, target: Node) -> Node {
    Node::Decorated {
        decorator_owner: owner.to_string(),
        decorator_name: name.to_string(),
        target: Box::new(target),
        has_parens: args.is_some(),
        positional_args: args.unwrap_or_default(),
        keyword_args: Vec::new(),
    }
}
