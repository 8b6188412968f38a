//! Runtime value types

use super::ast::Node;
use crate::executor::foreign::{ForeignFunction, Module};
use crate::executor::scheduler::TaskHandle;
use indexmap::IndexMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Rc<Vec<Value>>),
    Dict(Rc<IndexMap<DictKey, Value>>),
    Callable(Callable),
    Module(Rc<Module>),
    Task(TaskHandle),
    File(Rc<FileHandle>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(items))
    }

    pub fn dict(entries: IndexMap<DictKey, Value>) -> Value {
        Value::Dict(Rc::new(entries))
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    /// Type name as reported in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Array(_) => "array",
            Value::Dict(_) => "dict",
            Value::Callable(_) => "function",
            Value::Module(_) => "module",
            Value::Task(_) => "task",
            Value::File(_) => "file",
        }
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Dict(entries) => !entries.is_empty(),
            _ => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Representation used inside collections: strings are quoted
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{}'", s.replace('\'', "\\'")),
            other => other.to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.same(b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Task(a), Value::Task(b)) => a.id() == b.id(),
            (Value::File(a), Value::File(b)) => a.path == b.path,
            _ => false,
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let text = if f > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else {
        f.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", format_float(*x)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(Value::repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Dict(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.to_value().repr(), v.repr()))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Value::Callable(c) => write!(f, "<function {}>", c.name()),
            Value::Module(m) => write!(f, "<module '{}'>", m.path()),
            Value::Task(t) => write!(f, "<task {}>", t.name()),
            Value::File(h) => write!(f, "<file '{}'>", h.path.display()),
        }
    }
}

/* ===================== Dict Keys ===================== */

/// Hashable subset of values usable as dict keys
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictKey {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl DictKey {
    pub fn from_value(value: &Value) -> Option<DictKey> {
        match value {
            Value::None => Some(DictKey::None),
            Value::Bool(b) => Some(DictKey::Bool(*b)),
            Value::Int(n) => Some(DictKey::Int(*n)),
            Value::Str(s) => Some(DictKey::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            DictKey::None => Value::None,
            DictKey::Bool(b) => Value::Bool(*b),
            DictKey::Int(n) => Value::Int(*n),
            DictKey::Str(s) => Value::Str(s.clone()),
        }
    }
}

/* ===================== Callables ===================== */

/// Function defined in source: parameter names plus the body to evaluate
#[derive(Debug)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Node>,
}

/// Anything that can be invoked through `call_value`
#[derive(Debug, Clone)]
pub enum Callable {
    User(Rc<UserFunction>),
    Foreign(Rc<ForeignFunction>),
    /// `target` invoked with `args` prepended to the call's positional arguments
    Partial {
        target: Rc<Callable>,
        args: Rc<Vec<Value>>,
    },
    /// `first` invoked with the call's arguments, its result passed to `then`
    Pipe {
        first: Rc<Callable>,
        then: Rc<Callable>,
    },
}

impl Callable {
    pub fn name(&self) -> String {
        match self {
            Callable::User(f) => f.name.clone(),
            Callable::Foreign(f) => f.qualified_name(),
            Callable::Partial { target, .. } => format!("partial({})", target.name()),
            Callable::Pipe { first, then } => format!("{} | {}", first.name(), then.name()),
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Callable::User(_))
    }

    fn same(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::User(a), Callable::User(b)) => Rc::ptr_eq(a, b),
            (Callable::Foreign(a), Callable::Foreign(b)) => Rc::ptr_eq(a, b),
            (Callable::Partial { target: a, args: x }, Callable::Partial { target: b, args: y }) => {
                a.same(b) && x == y
            }
            (Callable::Pipe { first: a, then: x }, Callable::Pipe { first: b, then: y }) => {
                a.same(b) && x.same(y)
            }
            _ => false,
        }
    }
}

/* ===================== Files ===================== */

/// Handle produced by `open(...)`
#[derive(Debug)]
pub struct FileHandle {
    pub path: PathBuf,
}
