use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::config::{Dialect, InterpreterConfig};
use crate::executor::{self, stdlib};

#[derive(Parser)]
#[command(name = "mellow")]
#[command(about = "Mellow - evaluate a parsed Mellow/capn program", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Language dialect (overrides config file and env vars)
    #[arg(long, global = true, value_enum)]
    pub dialect: Option<DialectArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DialectArg {
    Mellow,
    Capn,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Mellow => Dialect::Mellow,
            DialectArg::Capn => Dialect::Capn,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate a program from its JSON-serialized AST
    Run {
        /// AST file produced by the parser
        path: PathBuf,

        /// Print the program's final value after it completes
        #[arg(long)]
        print_result: bool,
    },

    /// Decode an AST file without evaluating it
    Check {
        /// AST file produced by the parser
        path: PathBuf,
    },

    /// List the foreign modules available for import
    Modules,
}

impl Cli {
    /// Configuration with CLI overrides applied
    pub fn load_config(&self) -> Result<InterpreterConfig> {
        InterpreterConfig::builder()
            .config_path(self.config.clone())
            .dialect(self.dialect.map(Dialect::from))
            .build()
    }
}

/// Handle a parsed command with an already-loaded configuration
pub fn run_cli_with_config(cli: Cli, config: InterpreterConfig) -> Result<()> {
    match cli.command {
        Commands::Run { path, print_result } => {
            let program = read_program(&path)?;
            let result = executor::run_program(&program, config, std::io::stdout())?;
            if print_result {
                println!("{}", result);
            }
        }

        Commands::Check { path } => {
            let program = read_program(&path)?;
            println!("{}: ok ({})", path.display(), program.kind_name());
        }

        Commands::Modules => {
            for name in &config.modules {
                if let Some(module) = stdlib::module(name) {
                    let exports: Vec<String> = module.exports().keys().cloned().collect();
                    println!("{}: {}", name, exports.join(", "));
                }
            }
        }
    }

    Ok(())
}

fn read_program(path: &Path) -> Result<executor::Node> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let program = executor::load_program(&source)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(program)
}
