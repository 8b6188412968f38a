//! Interpreter configuration
//!
//! Sources, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. Config file (`mellow.toml`, or the path in `MELLOW_CONFIG_PATH` / `--config`)
//! 3. Environment variables prefixed with `MELLOW_` (e.g. `MELLOW_DIALECT=capn`)
//! 4. Builder overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::executor::stdlib;

const DEFAULT_CONFIG_FILE: &str = "mellow.toml";

/// Language dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Full language: quote-stripped strings, keyword-argument lookup tier
    #[default]
    Mellow,
    /// Older dialect: raw string literals, globals and call frame only
    Capn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    pub dialect: Dialect,

    /// Maximum nested user-function invocations before a RecursionError
    pub max_call_depth: usize,

    /// Default tracing filter for the binary (RUST_LOG wins when set)
    pub log_filter: String,

    /// Standard library modules registered at startup
    pub modules: Vec<String>,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::Mellow,
            max_call_depth: 256,
            log_filter: "warn".to_string(),
            modules: stdlib::MODULE_NAMES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl InterpreterConfig {
    /// Load configuration from the default file and environment
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder layering explicit overrides on top of file and environment sources
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    dialect: Option<Dialect>,
    max_call_depth: Option<usize>,
    modules: Option<Vec<String>>,
}

impl ConfigBuilder {
    /// Config file path (overrides default search)
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn dialect(mut self, dialect: Option<Dialect>) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn max_call_depth(mut self, depth: Option<usize>) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn modules(mut self, modules: Option<Vec<String>>) -> Self {
        self.modules = modules;
        self
    }

    pub fn build(self) -> Result<InterpreterConfig> {
        let env_path = std::env::var("MELLOW_CONFIG_PATH").ok().map(PathBuf::from);
        let (path, required) = match self.config_path.or(env_path) {
            Some(path) => (path, true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let mut builder = config::Config::builder()
            .add_source(config::File::from(path.clone()).required(required))
            .add_source(
                config::Environment::with_prefix("MELLOW")
                    .try_parsing(true)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("modules"),
            );

        if let Some(dialect) = self.dialect {
            let name = match dialect {
                Dialect::Mellow => "mellow",
                Dialect::Capn => "capn",
            };
            builder = builder.set_override("dialect", name)?;
        }
        if let Some(depth) = self.max_call_depth {
            builder = builder.set_override("max_call_depth", depth as i64)?;
        }
        if let Some(modules) = self.modules {
            builder = builder.set_override("modules", modules)?;
        }

        let config: InterpreterConfig = builder
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
            .try_deserialize()
            .context("Invalid configuration")?;

        config.validate()?;
        Ok(config)
    }
}

impl InterpreterConfig {
    fn validate(&self) -> Result<()> {
        if self.max_call_depth == 0 {
            anyhow::bail!("max_call_depth must be at least 1");
        }
        for module in &self.modules {
            if !stdlib::MODULE_NAMES.contains(&module.as_str()) {
                anyhow::bail!(
                    "Unknown stdlib module '{}' (available: {})",
                    module,
                    stdlib::MODULE_NAMES.join(", ")
                );
            }
        }
        Ok(())
    }
}
