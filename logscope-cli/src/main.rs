//! Logscope CLI -- access log analysis from the command line
//!
//! ```text
//! logscope analyze access.log [--enrich] [--top-n N] [--format combined|jsonl] [--export FILE]
//! logscope reputation example.com other.example
//! logscope config validate|show [--section NAME]
//! ```

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use cli::{Cli, Commands};
use output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = commands::load_config(&cli.config).await;

    // defaults when the config fails to load; `config validate` reports it
    let mut general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    if let Some(level) = &cli.log_level {
        general.log_level = level.clone();
    }
    if let Err(e) = logging::init_tracing(&general) {
        eprintln!("error: {e:#}");
        return ExitCode::from(2);
    }
    logscope_core::metrics::describe_all();

    tracing::debug!(config = %cli.config.display(), "logscope starting");

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
        Commands::Analyze(args) => match loaded {
            Ok(config) => commands::analyze::execute(args, config, &writer).await,
            Err(e) => Err(e),
        },
        Commands::Reputation(args) => match loaded {
            Ok(config) => commands::reputation::execute(args, config, &writer).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}
