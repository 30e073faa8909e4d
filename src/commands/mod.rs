pub mod init;
pub mod search;
pub mod stats;

use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

use crate::pipeline::RetrievalPipeline;
use crate::storage::read_corpus;
use crate::Config;

/// Load a JSONL corpus into a fresh in-memory pipeline.
pub(crate) async fn load_pipeline(config: &Config, corpus: &Path) -> Result<RetrievalPipeline> {
    let documents = read_corpus(corpus)?;
    let pipeline = RetrievalPipeline::from_config(config)?;

    let report = pipeline
        .ingest(documents)
        .await
        .with_context(|| format!("Failed to index corpus {}", corpus.display()))?;

    info!(
        corpus = %corpus.display(),
        documents = report.total_documents,
        "Loaded corpus"
    );
    Ok(pipeline)
}
