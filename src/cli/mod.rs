use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::SearchMode;

#[derive(Parser)]
#[command(name = "hybridrag")]
#[command(author, version, about = "Hybrid dense and lexical retrieval with rank fusion")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default configuration in the current directory
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Search a JSONL corpus
    Search {
        /// Search query
        query: String,

        /// JSONL file with one document per line
        #[arg(short, long)]
        corpus: PathBuf,

        /// Maximum number of results to return
        #[arg(short, long)]
        limit: Option<usize>,

        /// Retrieval mode: hybrid, vector or bm25
        #[arg(short, long)]
        mode: Option<SearchMode>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show index statistics and metrics for a JSONL corpus
    Stats {
        /// JSONL file with one document per line
        #[arg(short, long)]
        corpus: PathBuf,

        /// Output in Prometheus format
        #[arg(long)]
        prometheus: bool,
    },
}
