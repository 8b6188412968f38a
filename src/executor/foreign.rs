//! Foreign interop bridge
//!
//! Foreign modules are registered up front in a [`ForeignRegistry`]: a module
//! path maps to an ordered symbol table whose functions are typed
//! [`ForeignFunction`] descriptors (name, arity, sync or async). `Import`
//! copies a module's public symbols into the environment's import table;
//! `GetAttr` and `ForeignCall` resolve names against variables and imports.
//!
//! A reentrant foreign function receives an [`Invoker`] and can call any value
//! (a decorated wrapper, a stored callback) through the same `call_value` path
//! source-defined calls use.

use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

use super::calls::call_value;
use super::environment::Environment;
use super::errors::{EvalError, EvalResult};
use super::expressions::{evaluate_all, evaluate_keywords};
use super::types::{Callable, DictKey, Node, Value};

/// Boxed single-threaded future
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

pub type SyncFn = Rc<dyn Fn(Arguments) -> Result<Value, ForeignError>>;
pub type AsyncFn = Rc<dyn Fn(Arguments) -> LocalBoxFuture<'static, Result<Value, ForeignError>>>;
pub type ReentrantFn =
    Rc<dyn for<'a> Fn(Invoker<'a>, Arguments) -> LocalBoxFuture<'a, Result<Value, ForeignError>>>;

/// Failure reported by a foreign callable
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ForeignError {
    pub message: String,
}

impl ForeignError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<EvalError> for ForeignError {
    fn from(err: EvalError) -> Self {
        Self::new(err.to_string())
    }
}

/* ===================== Invoker ===================== */

/// Evaluator handle given to reentrant foreign functions
pub struct Invoker<'a> {
    env: &'a mut Environment,
}

impl<'a> Invoker<'a> {
    pub(crate) fn new(env: &'a mut Environment) -> Self {
        Self { env }
    }

    /// Call `callee` with positional arguments
    pub async fn call(&mut self, callee: &Value, positional: Vec<Value>) -> Result<Value, ForeignError> {
        self.call_with_keywords(callee, positional, IndexMap::new()).await
    }

    pub async fn call_with_keywords(
        &mut self,
        callee: &Value,
        positional: Vec<Value>,
        keyword: IndexMap<String, Value>,
    ) -> Result<Value, ForeignError> {
        Ok(call_value(self.env, callee, positional, keyword).await?)
    }
}

/* ===================== Arity ===================== */

/// Accepted positional argument counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
}

impl Arity {
    pub fn accepts(&self, given: usize) -> bool {
        match *self {
            Arity::Exact(n) => given == n,
            Arity::AtLeast(n) => given >= n,
            Arity::Range(lo, hi) => (lo..=hi).contains(&given),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
            Arity::Range(lo, hi) => write!(f, "{} to {}", lo, hi),
        }
    }
}

/* ===================== Arguments ===================== */

/// Evaluated actual arguments handed to a foreign callable
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    pub positional: Vec<Value>,
    pub keyword: IndexMap<String, Value>,
}

impl Arguments {
    pub fn new(positional: Vec<Value>, keyword: IndexMap<String, Value>) -> Self {
        Self {
            positional,
            keyword,
        }
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keyword.get(name)
    }

    /// Positional argument `index`, or keyword `name` when not given positionally
    pub fn param(&self, index: usize, name: &str) -> Option<&Value> {
        self.get(index).or_else(|| self.keyword(name))
    }

    pub fn value(&self, index: usize) -> Result<&Value, ForeignError> {
        self.get(index)
            .ok_or_else(|| ForeignError::new(format!("missing argument {}", index + 1)))
    }

    pub fn number(&self, index: usize) -> Result<f64, ForeignError> {
        let value = self.value(index)?;
        value.as_f64().ok_or_else(|| {
            ForeignError::new(format!(
                "argument {} must be a number, not {}",
                index + 1,
                value.type_name()
            ))
        })
    }

    pub fn string(&self, index: usize) -> Result<&str, ForeignError> {
        match self.value(index)? {
            Value::Str(s) => Ok(s),
            other => Err(ForeignError::new(format!(
                "argument {} must be a string, not {}",
                index + 1,
                other.type_name()
            ))),
        }
    }

    pub fn callable(&self, index: usize) -> Result<&Callable, ForeignError> {
        match self.value(index)? {
            Value::Callable(c) => Ok(c),
            other => Err(ForeignError::new(format!(
                "argument {} must be callable, not {}",
                index + 1,
                other.type_name()
            ))),
        }
    }
}

/* ===================== Foreign Functions ===================== */

pub enum ForeignKind {
    Sync(SyncFn),
    Async(AsyncFn),
    /// Runs inline and may call back into the evaluator
    Reentrant(ReentrantFn),
}

/// Typed descriptor of a host-provided callable
pub struct ForeignFunction {
    pub module: String,
    pub name: String,
    pub arity: Arity,
    pub kind: ForeignKind,
}

impl ForeignFunction {
    pub fn sync<F>(module: &str, name: &str, arity: Arity, func: F) -> Self
    where
        F: Fn(Arguments) -> Result<Value, ForeignError> + 'static,
    {
        Self {
            module: module.to_string(),
            name: name.to_string(),
            arity,
            kind: ForeignKind::Sync(Rc::new(func)),
        }
    }

    pub fn asynchronous<F, Fut>(module: &str, name: &str, arity: Arity, func: F) -> Self
    where
        F: Fn(Arguments) -> Fut + 'static,
        Fut: Future<Output = Result<Value, ForeignError>> + 'static,
    {
        Self {
            module: module.to_string(),
            name: name.to_string(),
            arity,
            kind: ForeignKind::Async(Rc::new(move |args| Box::pin(func(args)))),
        }
    }

    pub fn reentrant<F>(module: &str, name: &str, arity: Arity, func: F) -> Self
    where
        F: for<'a> Fn(Invoker<'a>, Arguments) -> LocalBoxFuture<'a, Result<Value, ForeignError>> + 'static,
    {
        Self {
            module: module.to_string(),
            name: name.to_string(),
            arity,
            kind: ForeignKind::Reentrant(Rc::new(func)),
        }
    }

    pub fn is_async(&self) -> bool {
        matches!(self.kind, ForeignKind::Async(_))
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    pub fn into_value(self) -> Value {
        Value::Callable(Callable::Foreign(Rc::new(self)))
    }
}

impl fmt::Debug for ForeignFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignFunction")
            .field("module", &self.module)
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("async", &self.is_async())
            .finish()
    }
}

/* ===================== Modules and Registry ===================== */

/// Foreign module: a dotted path and its symbol table
#[derive(Debug, Default)]
pub struct Module {
    path: String,
    symbols: IndexMap<String, Value>,
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            symbols: IndexMap::new(),
        }
    }

    pub fn function(mut self, function: ForeignFunction) -> Self {
        self.symbols.insert(function.name.clone(), function.into_value());
        self
    }

    pub fn constant(mut self, name: &str, value: Value) -> Self {
        self.symbols.insert(name.to_string(), value);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.symbols.get(name)
    }

    /// Public symbols; names with a leading underscore are private
    pub fn exports(&self) -> IndexMap<String, Value> {
        self.symbols
            .iter()
            .filter(|(name, _)| !name.starts_with('_'))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Module path -> module, populated at startup
#[derive(Debug, Default)]
pub struct ForeignRegistry {
    modules: HashMap<String, Rc<Module>>,
}

impl ForeignRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, module: Module) {
        debug!(module = %module.path(), symbols = module.symbols.len(), "registering foreign module");
        self.modules.insert(module.path.clone(), Rc::new(module));
    }

    pub fn resolve(&self, path: &str) -> Option<Rc<Module>> {
        self.modules.get(path).cloned()
    }

    pub fn module_paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }
}

/* ===================== Bridge Operations ===================== */

/// Resolve a module by dotted path and register its exports under an alias
pub fn import_module(
    env: &mut Environment,
    symbol_path: &str,
    relative_base: Option<&str>,
    alias: Option<&str>,
) -> EvalResult {
    let full_path = match relative_base {
        Some(base) if !base.is_empty() => {
            format!("{}.{}", base.trim_end_matches('.'), symbol_path.trim_start_matches('.'))
        }
        _ => symbol_path.to_string(),
    };

    let module = env
        .registry
        .resolve(&full_path)
        .ok_or_else(|| EvalError::not_defined("module", full_path.clone()))?;

    let alias = alias.unwrap_or(symbol_path).to_string();
    let exports = module.exports();
    debug!(module = %full_path, alias = %alias, exports = exports.len(), "import");
    env.imports.insert(alias, exports);

    Ok(Value::Module(module))
}

/// Attribute of a runtime value: module symbols and string-keyed dict entries
fn attribute_of(base_name: &str, value: &Value, attribute: &str) -> EvalResult {
    let found = match value {
        Value::Module(module) => module.get(attribute).cloned(),
        Value::Dict(entries) => entries.get(&DictKey::Str(attribute.to_string())).cloned(),
        _ => None,
    };
    found.ok_or_else(|| EvalError::attribute(base_name, attribute))
}

/// `base.attribute`: variables first, then the import table entry for `base`
pub fn get_attr(env: &Environment, base: &str, attribute: &str) -> EvalResult {
    if let Some(value) = env.variables.get(base) {
        return attribute_of(base, value, attribute);
    }
    if let Some(table) = env.imports.get(base) {
        return table
            .get(attribute)
            .cloned()
            .ok_or_else(|| EvalError::attribute(base, attribute));
    }
    Err(EvalError::attribute(base, attribute))
}

/// Resolve `module.function_name` for a foreign call or decorator
///
/// The import table wins; a variable named `module` is the fallback. A known
/// base lacking the name is an AttributeError, an unknown base is NotDefined.
pub fn resolve_foreign(env: &Environment, module: &str, function_name: &str) -> EvalResult {
    if let Some(value) = env
        .imports
        .get(module)
        .and_then(|table| table.get(function_name))
    {
        return Ok(value.clone());
    }
    if let Some(value) = env.variables.get(module) {
        return attribute_of(module, value, function_name);
    }
    if env.imports.contains_key(module) {
        return Err(EvalError::attribute(module, function_name));
    }
    Err(EvalError::not_defined(
        "foreign symbol",
        format!("{}.{}", module, function_name),
    ))
}

/// Evaluate a `ForeignCall` node
pub async fn foreign_call(
    env: &mut Environment,
    module: &str,
    function_name: &str,
    positional_args: &[Node],
    keyword_args: &[(String, Node)],
    is_awaited: bool,
) -> EvalResult {
    let callee = resolve_foreign(env, module, function_name)?;

    if is_awaited {
        if let Value::Callable(callable) = &callee {
            if callable.is_user() {
                return Err(EvalError::type_mismatch(format!(
                    "cannot await '{}': it is defined in this language, not a foreign function",
                    callable.name()
                )));
            }
        }
    }

    let positional = evaluate_all(positional_args, env).await?;
    let keyword = evaluate_keywords(keyword_args, env).await?;

    let result = call_value(env, &callee, positional, keyword).await?;
    if !is_awaited {
        return Ok(result);
    }

    match result {
        Value::Task(task) => {
            debug!(task = %task.name(), "await");
            env.scheduler.join(&task).await
        }
        other => Err(EvalError::type_mismatch(format!(
            "object of type {} returned by {}.{} can't be used in 'await' expression",
            other.type_name(),
            module,
            function_name
        ))),
    }
}
