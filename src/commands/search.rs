use anyhow::{Context, Result};
use std::env;
use std::path::Path;

use crate::config::SearchMode;
use crate::search::RetrievalResult;
use crate::Config;

/// Run the search command
///
/// Loads the corpus into memory, embeds any documents without a vector,
/// and prints the ranked results.
///
/// # Arguments
///
/// * `query` - The search query
/// * `corpus` - JSONL corpus file
/// * `limit` - Maximum number of results (defaults to the configured `top_k`)
/// * `mode` - Retrieval mode override
/// * `json` - Print the whole result as JSON
pub async fn run(
    query: &str,
    corpus: &Path,
    limit: Option<usize>,
    mode: Option<SearchMode>,
    json: bool,
) -> Result<()> {
    let root = env::current_dir()?;
    let config = Config::load(&root)?;

    let pipeline = super::load_pipeline(&config, corpus).await?;
    let result = pipeline.retrieve(query, limit, mode).await?;

    if json {
        let output =
            serde_json::to_string_pretty(&result).context("Failed to serialize search result")?;
        println!("{}", output);
        return Ok(());
    }

    print_results(&result);
    Ok(())
}

fn print_results(result: &RetrievalResult) {
    if result.documents.is_empty() {
        println!("No results found for: {}", result.query);
        return;
    }

    println!(
        "Found {} results for: \"{}\" ({}, {:.2}ms)\n",
        result.documents.len(),
        result.query,
        result.retrieval_method,
        result.latency_ms()
    );

    for (i, doc) in result.documents.iter().enumerate() {
        println!("{}. {} (score: {:.4}, {})", i + 1, doc.id, doc.score, doc.source);

        let preview: String = doc.content.chars().take(200).collect();
        let ellipsis = if doc.content.chars().count() > 200 { "..." } else { "" };
        println!("   {}{}", preview.replace('\n', " "), ellipsis);

        if !doc.metadata.is_empty() {
            let metadata = serde_json::to_string(&doc.metadata).unwrap_or_default();
            println!("   metadata: {}", metadata);
        }
        println!();
    }
}
