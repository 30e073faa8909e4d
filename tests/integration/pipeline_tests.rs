use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use hybridrag::commands::init::init_at;
use hybridrag::embeddings::{CachedEmbedder, EmbeddingProvider, HashingEmbedder};
use hybridrag::search::{Search, SourceTag};
use hybridrag::storage::read_corpus;
use hybridrag::{Config, IngestDocument, RetrievalPipeline, Retriever, SearchMode};

use crate::helpers::test_harness::TestHarness;

fn clinical_notes() -> Vec<IngestDocument> {
    vec![
        IngestDocument::without_embedding("n1", "patient reports chest pain and heart palpitations")
            .with_metadata("ward", json!("cardiology")),
        IngestDocument::without_embedding("n2", "insulin dosage adjusted for type two diabetes")
            .with_metadata("ward", json!("endocrinology")),
        IngestDocument::without_embedding("n3", "fractured wrist set in plaster cast"),
    ]
}

#[test]
fn test_config_round_trip() -> Result<()> {
    let harness = TestHarness::new()?;
    init_at(harness.path(), false)?;

    let mut config = Config::load(harness.path())?;
    config.retrieval.mode = SearchMode::Bm25;
    config.retrieval.rrf_k = 30.0;
    config.lexical.stopwords = Some(vec!["patient".to_string()]);
    config.save(harness.path())?;

    let loaded = Config::load(harness.path())?;
    assert_eq!(loaded.retrieval.mode, SearchMode::Bm25);
    assert!((loaded.retrieval.rrf_k - 30.0).abs() < 1e-12);
    assert_eq!(loaded.lexical.stopwords, Some(vec!["patient".to_string()]));
    Ok(())
}

#[test]
fn test_invalid_config_file_is_rejected() -> Result<()> {
    let harness = TestHarness::new()?;
    let path = Config::config_path(harness.path());
    std::fs::create_dir_all(path.parent().unwrap())?;
    std::fs::write(&path, "[retrieval]\ndense_weight = 0.0\nsparse_weight = 0.0\n")?;

    assert!(Config::load(harness.path()).is_err());
    Ok(())
}

#[tokio::test]
async fn test_jsonl_corpus_through_pipeline() -> Result<()> {
    let harness = TestHarness::new()?;
    let corpus = harness.write_corpus("notes.jsonl", &clinical_notes())?;

    let documents = read_corpus(&corpus)?;
    assert_eq!(documents.len(), 3);

    let pipeline = RetrievalPipeline::from_config(&harness.config)?;
    let report = pipeline.ingest(documents).await?;
    assert_eq!(report.inserted, 3);
    assert_eq!(
        pipeline.retriever().dimension(),
        Some(harness.config.embeddings.dimension)
    );

    let result = pipeline.retrieve("heart pain", Some(2), None).await?;
    assert_eq!(result.documents.len(), 2);
    assert_eq!(result.documents[0].id, "n1");
    assert_eq!(result.documents[0].source, SourceTag::Fused);
    assert_eq!(result.documents[0].metadata["ward"], json!("cardiology"));

    let value = serde_json::to_value(&result)?;
    assert_eq!(value["retrieval_method"], json!("hybrid_rrf"));
    assert_eq!(value["documents"][0]["source"], json!("fused"));
    Ok(())
}

#[tokio::test]
async fn test_mixed_precomputed_and_generated_embeddings() -> Result<()> {
    let mut config = Config::default();
    config.embeddings.dimension = 4;

    let pipeline = RetrievalPipeline::from_config(&config)?;
    let report = pipeline
        .ingest(vec![
            IngestDocument::new("pre", "precomputed vector", vec![0.5, 0.5, 0.5, 0.5]),
            IngestDocument::without_embedding("gen", "generated vector"),
        ])
        .await?;

    assert_eq!(report.inserted, 2);
    let snapshot = pipeline.retriever().snapshot();
    assert_eq!(snapshot.vector().get("gen").map(<[f32]>::len), Some(4));
    assert_eq!(
        snapshot.vector().get("pre"),
        Some(&[0.5f32, 0.5, 0.5, 0.5][..])
    );
    Ok(())
}

#[tokio::test]
async fn test_pipeline_over_cached_provider() -> Result<()> {
    let config = Config::default();
    let embedder = Arc::new(CachedEmbedder::new(HashingEmbedder::new(32)));
    let pipeline = RetrievalPipeline::new(
        Arc::new(Retriever::from_config(&config)?),
        Arc::clone(&embedder) as Arc<dyn EmbeddingProvider>,
    );

    pipeline.ingest(clinical_notes()).await?;
    assert_eq!(embedder.cache_len().await, 3);

    let first = pipeline.search("diabetes insulin", 3).await?;
    let second = pipeline.search("diabetes insulin", 3).await?;
    assert_eq!(first, second);
    assert_eq!(first[0].id, "n2");
    assert_eq!(embedder.cache_len().await, 4);
    Ok(())
}

#[tokio::test]
async fn test_removal_through_pipeline() -> Result<()> {
    let pipeline = RetrievalPipeline::from_config(&Config::default())?;
    pipeline.ingest(clinical_notes()).await?;

    assert_eq!(pipeline.remove(vec!["n3".to_string()]).await?, 1);
    assert!(pipeline.remove(vec!["n3".to_string()]).await.is_err());

    let result = pipeline
        .retrieve("plaster cast", None, Some(SearchMode::Bm25))
        .await?;
    assert!(result.documents.iter().all(|d| d.id != "n3"));
    assert_eq!(result.total_candidates, 2);
    Ok(())
}
