//! Runtime environment for one program run
//!
//! Holds global variables, the function table, the call stack, imported
//! symbol tables, the decorator registry, the foreign registry and the
//! scheduler. It is passed explicitly to every evaluation step.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;
use tracing::trace;

use super::errors::{EvalError, EvalResult};
use super::foreign::ForeignRegistry;
use super::scheduler::Scheduler;
use super::types::{UserFunction, Value};
use crate::config::{Dialect, InterpreterConfig};

/* ===================== Call Frames ===================== */

/// Parameter bindings of one active invocation
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub function: String,
    pub bindings: HashMap<String, Value>,
}

/// Formal parameter names paired positionally with the actual arguments of
/// the most recent invocation. Survives the call's return.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    params: Vec<String>,
    args: Vec<Value>,
}

impl KeywordTable {
    pub fn new(params: Vec<String>, args: Vec<Value>) -> Self {
        Self { params, args }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .position(|p| p == name)
            .and_then(|i| self.args.get(i))
    }
}

/* ===================== Environment ===================== */

pub struct Environment {
    /// Global bindings; there is no lexical nesting
    pub variables: HashMap<String, Value>,
    pub functions: HashMap<String, Rc<UserFunction>>,
    pub imports: HashMap<String, IndexMap<String, Value>>,
    pub decorators: HashMap<String, Value>,
    pub registry: ForeignRegistry,
    pub scheduler: Scheduler,
    pub config: InterpreterConfig,
    frames: Vec<CallFrame>,
    last_invocation: Option<KeywordTable>,
    output: Box<dyn Write>,
}

impl Environment {
    pub fn new(config: InterpreterConfig, registry: ForeignRegistry) -> Self {
        Self {
            variables: HashMap::new(),
            functions: HashMap::new(),
            imports: HashMap::new(),
            decorators: HashMap::new(),
            registry,
            scheduler: Scheduler::new(),
            config,
            frames: Vec::new(),
            last_invocation: None,
            output: Box::new(std::io::stdout()),
        }
    }

    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    pub fn dialect(&self) -> Dialect {
        self.config.dialect
    }

    /* ---------- names ---------- */

    /// Resolve a variable reference
    ///
    /// Order: active call frame, global variables, then the keyword table of
    /// the most recent invocation (Mellow dialect only).
    pub fn lookup(&self, name: &str) -> EvalResult {
        if let Some(value) = self.frames.last().and_then(|f| f.bindings.get(name)) {
            trace!(name, "resolved from call frame");
            return Ok(value.clone());
        }
        if let Some(value) = self.variables.get(name) {
            trace!(name, "resolved from globals");
            return Ok(value.clone());
        }
        if self.dialect() == Dialect::Mellow {
            if let Some(value) = self.last_invocation.as_ref().and_then(|t| t.get(name)) {
                trace!(name, "resolved from keyword table");
                return Ok(value.clone());
            }
        }
        Err(EvalError::not_defined("name", name))
    }

    /// Bind a global; the latest assignment wins
    pub fn assign(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    /* ---------- call stack ---------- */

    pub fn push_frame(&mut self, frame: CallFrame) -> EvalResult<()> {
        if self.frames.len() >= self.config.max_call_depth {
            return Err(EvalError::Recursion {
                function: frame.function,
                limit: self.config.max_call_depth,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop_frame(&mut self) -> Option<CallFrame> {
        self.frames.pop()
    }

    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn record_invocation(&mut self, table: KeywordTable) {
        self.last_invocation = Some(table);
    }

    /* ---------- output ---------- */

    pub fn write_line(&mut self, text: &str) -> EvalResult<()> {
        writeln!(self.output, "{}", text)
            .and_then(|_| self.output.flush())
            .map_err(|err| EvalError::io("<output>", err))
    }
}
