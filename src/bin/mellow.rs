//! Mellow CLI
//!
//! Evaluates programs handed over as JSON-serialized ASTs. Logs go to stderr;
//! program output goes to stdout.

use clap::Parser;
use mellow::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run_cli_with_config(cli, config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
