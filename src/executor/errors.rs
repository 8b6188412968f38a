//! Evaluation errors
//!
//! Every evaluation-time failure aborts the whole run. The diagnostic names
//! the error kind followed by the offending name or value.

use thiserror::Error;

/* ===================== Error Kind Names ===================== */

pub const NOT_DEFINED: &str = "NotDefinedError";
pub const INVALID_ASSIGNMENT_TARGET: &str = "InvalidAssignmentTargetError";
pub const ARITY: &str = "ArityError";
pub const ATTRIBUTE: &str = "AttributeError";
pub const TYPE_MISMATCH: &str = "TypeMismatchError";
pub const PARSE_TERMINATION: &str = "ParseTerminationError";
pub const ZERO_DIVISION: &str = "ZeroDivisionError";
pub const INDEX: &str = "IndexError";
pub const IO: &str = "IoError";
pub const FOREIGN: &str = "ForeignError";
pub const RECURSION: &str = "RecursionError";
pub const INVALID_LITERAL: &str = "InvalidLiteralError";

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("NotDefinedError: {what} '{name}' is not defined")]
    NotDefined { what: &'static str, name: String },

    #[error("InvalidAssignmentTargetError: cannot assign to {found}")]
    InvalidAssignmentTarget { found: String },

    #[error("ArityError: {function}() takes {expected} argument(s) but {given} were given")]
    Arity {
        function: String,
        expected: String,
        given: usize,
    },

    #[error("AttributeError: '{base}' has no attribute '{attribute}'")]
    Attribute { base: String, attribute: String },

    #[error("TypeMismatchError: {message}")]
    TypeMismatch { message: String },

    #[error("ParseTerminationError: {message}")]
    ParseTermination { message: String },

    #[error("ZeroDivisionError: division by zero")]
    ZeroDivision,

    #[error("IndexError: index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("IoError: {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ForeignError: {function}: {message}")]
    Foreign { function: String, message: String },

    #[error("RecursionError: maximum call depth of {limit} exceeded calling {function}()")]
    Recursion { function: String, limit: usize },

    #[error("InvalidLiteralError: '{text}' is not an integer literal")]
    InvalidLiteral { text: String },
}

impl EvalError {
    /// Diagnostic kind name
    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::NotDefined { .. } => NOT_DEFINED,
            EvalError::InvalidAssignmentTarget { .. } => INVALID_ASSIGNMENT_TARGET,
            EvalError::Arity { .. } => ARITY,
            EvalError::Attribute { .. } => ATTRIBUTE,
            EvalError::TypeMismatch { .. } => TYPE_MISMATCH,
            EvalError::ParseTermination { .. } => PARSE_TERMINATION,
            EvalError::ZeroDivision => ZERO_DIVISION,
            EvalError::IndexOutOfRange { .. } => INDEX,
            EvalError::Io { .. } => IO,
            EvalError::Foreign { .. } => FOREIGN,
            EvalError::Recursion { .. } => RECURSION,
            EvalError::InvalidLiteral { .. } => INVALID_LITERAL,
        }
    }

    pub fn not_defined(what: &'static str, name: impl Into<String>) -> Self {
        EvalError::NotDefined {
            what,
            name: name.into(),
        }
    }

    pub fn type_mismatch(message: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            message: message.into(),
        }
    }

    pub fn attribute(base: impl Into<String>, attribute: impl Into<String>) -> Self {
        EvalError::Attribute {
            base: base.into(),
            attribute: attribute.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type EvalResult<T = crate::executor::Value> = Result<T, EvalError>;
