//! Stats command for displaying index statistics and metrics

use anyhow::Result;
use std::env;
use std::path::Path;

use crate::metrics::{gather_metrics, register_metrics, MetricSnapshot};
use crate::Config;

/// Run the stats command
///
/// # Arguments
/// * `corpus` - JSONL corpus file to index
/// * `prometheus` - If true, output in Prometheus text format
pub async fn run(corpus: &Path, prometheus: bool) -> Result<()> {
    let root = env::current_dir()?;
    let config = Config::load(&root)?;

    register_metrics();
    let pipeline = super::load_pipeline(&config, corpus).await?;

    if prometheus {
        print!("{}", gather_metrics());
        return Ok(());
    }

    let snapshot = pipeline.retriever().snapshot();
    let metrics = MetricSnapshot::capture();

    println!("hybridrag Index Statistics");
    println!("==========================\n");

    println!("Index Contents:");
    println!("  Documents:         {}", snapshot.len());
    println!("  Vocabulary size:   {}", snapshot.lexical().vocabulary_size());
    println!("  Avg doc length:    {:.2}", snapshot.lexical().avg_doc_length());
    match snapshot.dimension() {
        Some(dimension) => println!("  Vector dimension:  {}", dimension),
        None => println!("  Vector dimension:  (unset)"),
    }
    println!("  Index version:     {}", snapshot.version());
    println!();

    println!("Ingestion Metrics:");
    println!("  Batches applied:   {:.0}", metrics.ingest_batches_total);
    println!("  Batches rejected:  {:.0}", metrics.rejected_batches_total);
    if metrics.ingest_batches_total > 0.0 {
        println!("  Average latency:   {:.3}s", metrics.ingest_latency_avg);
    }
    println!();

    println!("Embeddings:");
    println!("  Provider:          {}", pipeline.embedder().provider_name());
    println!("  Dimension:         {}", pipeline.embedder().embedding_dimension());

    Ok(())
}
