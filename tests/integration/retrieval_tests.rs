use anyhow::Result;
use serde_json::json;

use hybridrag::config::{LexicalConfig, RetrievalConfig};
use hybridrag::search::{SourceTag, StopwordTokenizer};
use hybridrag::{IngestDocument, RetrievalError, RetrievalRequest, Retriever, SearchMode};

use crate::helpers::test_utils::{
    create_loaded_retriever, create_test_retriever, medical_corpus, synthetic_corpus, test_vector,
};

#[test]
fn test_idf_matches_closed_form() {
    let retriever = create_loaded_retriever();
    let snapshot = retriever.snapshot();

    assert_eq!(snapshot.lexical().document_frequency("heart"), 2);
    let expected = ((3.0 - 2.0 + 0.5) / (2.0 + 0.5) + 1.0f64).ln();
    let idf = snapshot.lexical().idf("heart").unwrap();
    assert!((idf - expected).abs() < 1e-12, "idf {} != {}", idf, expected);
}

#[test]
fn test_empty_retriever_returns_empty_result() -> Result<()> {
    let retriever = create_test_retriever();

    let result = retriever.retrieve(&RetrievalRequest::new("anything", &[0.3, 0.1]))?;

    assert!(result.documents.is_empty());
    assert_eq!(result.total_candidates, 0);
    assert_eq!(result.index_version, 0);
    Ok(())
}

#[test]
fn test_retrieve_is_deterministic() -> Result<()> {
    let retriever = Retriever::new(RetrievalConfig::default(), &LexicalConfig::default())?;
    retriever.add_documents(synthetic_corpus(200, 16))?;

    let query = test_vector(7, 16);
    let request = RetrievalRequest::new("cardiac insulin study", &query).with_top_k(25);

    let first = retriever.retrieve(&request)?;
    let second = retriever.retrieve(&request)?;

    assert_eq!(first.documents.len(), 25);
    assert_eq!(
        serde_json::to_string(&first.documents)?,
        serde_json::to_string(&second.documents)?
    );
    Ok(())
}

#[test]
fn test_identical_documents_order_by_id() -> Result<()> {
    let retriever = create_test_retriever();
    retriever.add_documents(vec![
        IngestDocument::new("zeta", "shared clinical note", vec![0.5, 0.5]),
        IngestDocument::new("alpha", "shared clinical note", vec![0.5, 0.5]),
        IngestDocument::new("mid", "shared clinical note", vec![0.5, 0.5]),
    ])?;

    for mode in [SearchMode::Vector, SearchMode::Bm25, SearchMode::Hybrid] {
        let result = retriever
            .retrieve(&RetrievalRequest::new("clinical", &[1.0, 1.0]).with_mode(mode))?;
        let ids: Vec<_> = result.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"], "mode {}", mode);
    }
    Ok(())
}

#[test]
fn test_upsert_idempotence() -> Result<()> {
    let once = create_loaded_retriever();
    let twice = create_loaded_retriever();
    twice.add_documents(medical_corpus())?;

    let a = once.snapshot();
    let b = twice.snapshot();

    for term in ["heart", "diabetes", "unrelated", "topic", "risk"] {
        assert_eq!(
            a.lexical().document_frequency(term),
            b.lexical().document_frequency(term),
            "df({})",
            term
        );
        assert_eq!(a.lexical().idf(term), b.lexical().idf(term), "idf({})", term);
    }
    assert_eq!(a.lexical().avg_doc_length(), b.lexical().avg_doc_length());
    assert_eq!(a.vector().len(), b.vector().len());
    assert_eq!(a.len(), b.len());
    assert_eq!(b.version(), 2);
    Ok(())
}

#[test]
fn test_wrong_dimension_leaves_indices_unchanged() {
    let retriever = create_loaded_retriever();
    let before = retriever.snapshot();

    let batch = vec![
        IngestDocument::new("d4", "heart valve repair", vec![0.0, 1.0, 0.0]),
        IngestDocument::new("d5", "heart rhythm", vec![0.0, 1.0]),
    ];
    let err = retriever.add_documents(batch).unwrap_err();

    assert_eq!(
        err,
        RetrievalError::DimensionMismatch {
            id: "d5".to_string(),
            expected: 3,
            actual: 2
        }
    );
    assert!(err.is_validation());
    assert!(!err.is_retryable());

    let after = retriever.snapshot();
    assert_eq!(after.version(), before.version());
    assert_eq!(after.len(), 3);
    assert!(after.documents().get("d4").is_none());
    assert!(after.vector().get("d4").is_none());
    assert_eq!(after.lexical().len(), 3);
    assert_eq!(after.lexical().document_frequency("heart"), 2);
    assert_eq!(after.lexical().avg_doc_length(), before.lexical().avg_doc_length());
}

#[test]
fn test_update_replaces_content_and_embedding_together() -> Result<()> {
    let retriever = create_loaded_retriever();
    retriever.add_documents(vec![IngestDocument::new(
        "d1",
        "kidney stones",
        vec![0.0, 0.0, 1.0],
    )
    .with_metadata("revised", json!(true))])?;

    let snapshot = retriever.snapshot();
    let doc = snapshot.documents().get("d1").unwrap();
    assert_eq!(doc.content, "kidney stones");
    assert_eq!(doc.metadata["revised"], json!(true));
    assert_eq!(snapshot.vector().get("d1"), Some(&[0.0f32, 0.0, 1.0][..]));
    assert_eq!(snapshot.lexical().document_frequency("heart"), 1);
    assert_eq!(snapshot.lexical().document_frequency("kidney"), 1);

    let result = retriever.retrieve(
        &RetrievalRequest::new("heart disease", &[1.0, 0.0, 0.0]).with_mode(SearchMode::Bm25),
    )?;
    assert_eq!(result.documents[0].id, "d2");
    Ok(())
}

#[test]
fn test_hybrid_ranks_consistent_document_first() -> Result<()> {
    let retriever = create_loaded_retriever();

    let result = retriever.retrieve(&RetrievalRequest::new("heart disease", &[1.0, 0.0, 0.0]))?;

    assert_eq!(result.retrieval_method, "hybrid_rrf");
    assert_eq!(result.total_candidates, 3);
    assert_eq!(result.documents[0].id, "d1");
    assert!(result.documents.iter().all(|d| d.source == SourceTag::Fused));

    // Dense rank 0 and sparse rank 0 with default weights.
    let expected = 0.7 / 61.0 + 0.3 / 61.0;
    assert!((result.documents[0].score - expected).abs() < 1e-12);
    assert_eq!(result.contexts()[0], "heart disease risk");
    Ok(())
}

#[test]
fn test_query_without_terms_still_fuses_dense_ranking() -> Result<()> {
    let retriever = create_loaded_retriever();

    // Every query token is a stopword; the sparse side ranks all documents at zero.
    let result = retriever.retrieve(&RetrievalRequest::new("the and of", &[0.0, 0.0, 1.0]))?;
    assert_eq!(result.documents[0].id, "d3");

    let sparse = retriever.retrieve(
        &RetrievalRequest::new("the and of", &[]).with_mode(SearchMode::Bm25),
    )?;
    assert!(sparse.documents.iter().all(|d| d.score == 0.0));
    Ok(())
}

#[test]
fn test_query_vector_is_validated() {
    let retriever = create_loaded_retriever();

    let err = retriever
        .retrieve(&RetrievalRequest::new("heart", &[1.0, f32::INFINITY, 0.0]))
        .unwrap_err();
    assert_eq!(err, RetrievalError::NonFiniteQuery);

    let err = retriever
        .retrieve(&RetrievalRequest::new("heart", &[1.0]).with_mode(SearchMode::Vector))
        .unwrap_err();
    assert!(matches!(err, RetrievalError::QueryDimensionMismatch { .. }));
}

#[test]
fn test_candidate_multiplier_limits_fusion_pool() -> Result<()> {
    let retriever = Retriever::new(RetrievalConfig::default(), &LexicalConfig::default())?;
    retriever.add_documents(synthetic_corpus(50, 8))?;
    let query = test_vector(3, 8);

    let narrow = retriever.retrieve(
        &RetrievalRequest::new("renal", &query)
            .with_top_k(5)
            .with_candidate_multiplier(1),
    )?;
    let wide = retriever.retrieve(
        &RetrievalRequest::new("renal", &query)
            .with_top_k(5)
            .with_candidate_multiplier(10),
    )?;

    assert_eq!(narrow.documents.len(), 5);
    assert_eq!(wide.documents.len(), 5);
    Ok(())
}

#[test]
fn test_remove_then_reinsert() -> Result<()> {
    let retriever = create_loaded_retriever();

    retriever.remove_documents(&["d1", "d2", "d3"])?;
    assert!(retriever.is_empty());
    assert_eq!(retriever.dimension(), Some(3));

    let result = retriever.retrieve(&RetrievalRequest::new("heart", &[1.0, 0.0, 0.0]))?;
    assert!(result.documents.is_empty());

    let err = retriever
        .add_documents(vec![IngestDocument::new("d9", "heart", vec![1.0])])
        .unwrap_err();
    assert!(matches!(err, RetrievalError::DimensionMismatch { expected: 3, .. }));

    retriever.add_documents(vec![IngestDocument::new("d9", "heart", vec![0.0, 1.0, 0.0])])?;
    assert_eq!(retriever.version(), 3);
    Ok(())
}

#[test]
fn test_custom_tokenizer_policy() -> Result<()> {
    let tokenizer = StopwordTokenizer::new(["risk"], 1);
    let retriever = Retriever::with_tokenizer(
        RetrievalConfig::default(),
        Default::default(),
        std::sync::Arc::new(tokenizer),
    )?;
    retriever.add_documents(medical_corpus())?;

    let lexical = retriever.snapshot();
    assert_eq!(lexical.lexical().document_frequency("risk"), 0);
    assert_eq!(lexical.lexical().document_frequency("and"), 1);
    Ok(())
}
