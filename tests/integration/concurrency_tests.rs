use anyhow::Result;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use hybridrag::config::RetrievalConfig;
use hybridrag::search::{Bm25Params, StopwordTokenizer, Tokenizer};
use hybridrag::{IngestDocument, RetrievalError, RetrievalPhase, RetrievalRequest, Retriever};

use crate::helpers::test_utils::{create_loaded_retriever, medical_corpus, synthetic_corpus};

/// A tokenizer that signals and then stalls whenever it sees the word "slow",
/// holding the writer inside an ingestion batch.
fn stalling_tokenizer(started: mpsc::Sender<()>, stall: Duration) -> Arc<dyn Tokenizer> {
    let inner = StopwordTokenizer::english();
    let started = Mutex::new(started);
    Arc::new(move |text: &str| -> Vec<String> {
        if text.contains("slow") {
            if let Ok(tx) = started.lock() {
                let _ = tx.send(());
            }
            thread::sleep(stall);
        }
        inner.tokenize(text)
    })
}

fn stalling_retriever(write_timeout_ms: u64) -> (Arc<Retriever>, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel();
    let config = RetrievalConfig {
        write_timeout_ms,
        ..RetrievalConfig::default()
    };
    let retriever = Retriever::with_tokenizer(
        config,
        Bm25Params::default(),
        stalling_tokenizer(tx, Duration::from_millis(400)),
    )
    .expect("valid configuration");
    (Arc::new(retriever), rx)
}

#[test]
fn test_second_writer_gets_write_conflict() -> Result<()> {
    let (retriever, started) = stalling_retriever(50);

    let writer = {
        let retriever = Arc::clone(&retriever);
        thread::spawn(move || {
            retriever.add_documents(vec![IngestDocument::new(
                "s1",
                "slow ingestion batch",
                vec![1.0, 0.0],
            )])
        })
    };
    started.recv_timeout(Duration::from_secs(5))?;

    let err = retriever
        .add_documents(vec![IngestDocument::new("s2", "fast batch", vec![0.0, 1.0])])
        .unwrap_err();
    assert_eq!(err, RetrievalError::WriteConflict { waited_ms: 50 });
    assert!(err.is_retryable());

    let report = writer.join().expect("writer thread panicked")?;
    assert_eq!(report.index_version, 1);

    // Retrying after the first writer finishes succeeds.
    let report = retriever.add_documents(vec![IngestDocument::new("s2", "fast batch", vec![0.0, 1.0])])?;
    assert_eq!(report.index_version, 2);
    assert_eq!(report.total_documents, 2);
    Ok(())
}

#[test]
fn test_readers_see_previous_snapshot_during_write() -> Result<()> {
    let (retriever, started) = stalling_retriever(5_000);
    retriever.add_documents(vec![
        IngestDocument::new("a", "heart disease risk", vec![1.0, 0.0]),
        IngestDocument::new("b", "diabetes care", vec![0.0, 1.0]),
    ])?;
    let before = retriever.snapshot();

    let writer = {
        let retriever = Arc::clone(&retriever);
        thread::spawn(move || {
            retriever.add_documents(vec![
                IngestDocument::new("c", "heart surgery slow recovery", vec![0.7, 0.7]),
                IngestDocument::new("d", "heart failure", vec![0.9, 0.1]),
            ])
        })
    };
    started.recv_timeout(Duration::from_secs(5))?;

    // Mid-batch: readers still see version 1 with its statistics intact.
    let result = retriever.retrieve(&RetrievalRequest::new("heart", &[1.0, 0.0]))?;
    assert_eq!(result.index_version, 1);
    assert_eq!(result.total_candidates, 2);
    let during = retriever.snapshot();
    assert_eq!(during.lexical().document_frequency("heart"), 1);
    assert_eq!(during.lexical().avg_doc_length(), before.lexical().avg_doc_length());

    writer.join().expect("writer thread panicked")?;

    let after = retriever.snapshot();
    assert_eq!(after.version(), 2);
    assert_eq!(after.lexical().document_frequency("heart"), 3);
    // The old snapshot held by a reader is never mutated.
    assert_eq!(before.lexical().document_frequency("heart"), 1);
    assert_eq!(before.len(), 2);
    Ok(())
}

#[test]
fn test_deadline_expiring_during_sparse_search_fails_fusion() -> Result<()> {
    let (retriever, started) = stalling_retriever(5_000);
    retriever.add_documents(vec![
        IngestDocument::new("a", "heart disease risk", vec![1.0, 0.0]),
        IngestDocument::new("b", "diabetes care", vec![0.0, 1.0]),
    ])?;

    // Query tokenization stalls for 400ms, well past the 100ms budget.
    let request = RetrievalRequest::new("slow heart", &[1.0, 0.0]).with_timeout(Duration::from_millis(100));
    let err = retriever.retrieve(&request).unwrap_err();
    started.recv_timeout(Duration::from_secs(5))?;

    assert_eq!(err, RetrievalError::DeadlineExceeded(RetrievalPhase::Fusion));
    assert!(!err.is_validation());

    // Without a deadline the same query completes against the same snapshot.
    let result = retriever.retrieve(&RetrievalRequest::new("slow heart", &[1.0, 0.0]))?;
    assert_eq!(result.documents[0].id, "a");
    Ok(())
}

#[test]
fn test_parallel_readers_agree() -> Result<()> {
    let retriever = Arc::new(Retriever::new(
        RetrievalConfig::default(),
        &Default::default(),
    )?);
    retriever.add_documents(synthetic_corpus(120, 8))?;
    let query = vec![0.3f32, 0.1, 0.4, 0.1, 0.5, 0.9, 0.2, 0.6];
    let baseline = retriever.retrieve(&RetrievalRequest::new("cardiac study", &query))?;

    thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let retriever = &retriever;
                let query = &query;
                scope.spawn(move || {
                    retriever
                        .retrieve(&RetrievalRequest::new("cardiac study", query))
                        .map(|r| r.documents)
                })
            })
            .collect();

        for handle in handles {
            let documents = handle.join().expect("reader panicked").expect("retrieve failed");
            assert_eq!(documents, baseline.documents);
        }
    });
    Ok(())
}

#[test]
fn test_concurrent_writers_serialize() -> Result<()> {
    let retriever = Arc::new(create_loaded_retriever());

    thread::scope(|scope| {
        for i in 0..6 {
            let retriever = &retriever;
            scope.spawn(move || {
                let id = format!("w{}", i);
                retriever
                    .add_documents(vec![IngestDocument::new(id, "heart monitor", vec![0.0, 1.0, 0.0])])
                    .expect("writer should acquire the lock within the default timeout");
            });
        }
    });

    let snapshot = retriever.snapshot();
    assert_eq!(snapshot.version(), 7);
    assert_eq!(snapshot.len(), medical_corpus().len() + 6);
    assert_eq!(snapshot.lexical().document_frequency("heart"), 8);
    Ok(())
}
