use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use hybridrag::cli::{Cli, Commands};
use hybridrag::config::Config;
use hybridrag::logging::{init_early_logging, init_logging};
use hybridrag::metrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let config = match Config::load(&root) {
        Ok(config) => config,
        Err(e) => {
            init_early_logging();
            tracing::error!("{:#}", e);
            return Err(e);
        }
    };

    // The guard MUST be held until program exit to ensure logs are flushed
    let _logging_guard = init_logging(&config.logging, &root)?;
    tracing::debug!("Loaded configuration from: {}", root.display());

    metrics::register_metrics();

    match cli.command {
        Commands::Init { force } => {
            hybridrag::commands::init::run(force).await?;
        }
        Commands::Search {
            query,
            corpus,
            limit,
            mode,
            json,
        } => {
            hybridrag::commands::search::run(&query, &corpus, limit, mode, json).await?;
        }
        Commands::Stats { corpus, prometheus } => {
            hybridrag::commands::stats::run(&corpus, prometheus).await?;
        }
    }

    Ok(())
}
