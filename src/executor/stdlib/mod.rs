//! Standard library modules
//!
//! Each module is a foreign module registered in the `ForeignRegistry` at
//! startup. Which ones are registered is controlled by
//! `InterpreterConfig::modules`.

pub mod asyncio;
pub mod functools;
pub mod math;
pub mod string;
pub mod time;

use super::foreign::{ForeignRegistry, Module};

/// Names of every stdlib module
pub const MODULE_NAMES: &[&str] = &["asyncio", "functools", "math", "string", "time"];

/// Build a stdlib module by name
pub fn module(name: &str) -> Option<Module> {
    match name {
        "asyncio" => Some(asyncio::module()),
        "functools" => Some(functools::module()),
        "math" => Some(math::module()),
        "string" => Some(string::module()),
        "time" => Some(time::module()),
        _ => None,
    }
}

/// Registry holding the requested stdlib modules; unknown names are skipped
pub fn registry<S: AsRef<str>>(modules: &[S]) -> ForeignRegistry {
    let mut registry = ForeignRegistry::new();
    for name in modules {
        if let Some(module) = module(name.as_ref()) {
            registry.register(module);
        }
    }
    registry
}
