//! Hybrid retriever: owns the document store and both indices.
//!
//! All three structures live in one immutable [`IndexSnapshot`]. Readers clone
//! the current `Arc<IndexSnapshot>` and search it without holding any lock.
//! Writers are serialized by a mutex with a bounded wait; each write batch
//! builds a new snapshot from a copy of the current one, recomputes the
//! lexical statistics once, and publishes it with a single pointer swap. A
//! rejected batch drops its copy, so no reader ever sees partial state.

use parking_lot::{Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::bm25::{Bm25Params, LexicalIndex};
use super::hybrid::{FusedCandidate, FusionWeights, RrfFusion};
use super::tokenizer::{tokenizer_from_config, Tokenizer};
use super::traits::{RankedCandidate, SourceTag};
use super::vector::VectorIndex;
use crate::config::{Config, LexicalConfig, RetrievalConfig, SearchMode};
use crate::error::{Result, RetrievalError, RetrievalPhase};
use crate::metrics::{
    INDEXED_DOCUMENTS, INGEST_BATCHES, INGEST_LATENCY, REJECTED_BATCHES, RETRIEVAL_LATENCY,
    RETRIEVAL_REQUESTS, RETRIEVAL_RESULTS, WRITE_CONFLICTS,
};
use crate::storage::{check_embedding, Document, DocumentStore, IngestDocument, Metadata};

/// One consistent version of the corpus and its indices.
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    version: u64,
    documents: DocumentStore,
    lexical: LexicalIndex,
    vector: VectorIndex,
}

impl IndexSnapshot {
    fn empty(tokenizer: Arc<dyn Tokenizer>, params: Bm25Params) -> Self {
        Self {
            version: 0,
            documents: DocumentStore::new(),
            lexical: LexicalIndex::new(tokenizer, params),
            vector: VectorIndex::new(),
        }
    }

    /// 0 for the empty index, +1 per published write batch.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn vector(&self) -> &VectorIndex {
        &self.vector
    }

    pub fn dimension(&self) -> Option<usize> {
        self.documents.dimension()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// A query: text for the sparse side, an embedding for the dense side.
#[derive(Debug, Clone)]
pub struct RetrievalRequest<'a> {
    pub query_text: &'a str,
    pub query_vector: &'a [f32],
    /// Defaults to the configured `top_k`
    pub top_k: Option<usize>,
    /// Defaults to the configured multiplier
    pub candidate_multiplier: Option<usize>,
    /// Defaults to the configured mode
    pub mode: Option<SearchMode>,
    /// Checked between phases; passing it fails the whole call
    pub deadline: Option<Instant>,
}

impl<'a> RetrievalRequest<'a> {
    pub fn new(query_text: &'a str, query_vector: &'a [f32]) -> Self {
        Self {
            query_text,
            query_vector,
            top_k: None,
            candidate_multiplier: None,
            mode: None,
            deadline: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_candidate_multiplier(mut self, multiplier: usize) -> Self {
        self.candidate_multiplier = Some(multiplier);
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

/// A ranked document with everything a reranker needs to rescore it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: String,
    pub content: String,
    pub score: f64,
    pub metadata: Metadata,
    pub source: SourceTag,
}

/// Result of a retrieval operation.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResult {
    pub documents: Vec<RetrievedDocument>,
    pub query: String,
    pub retrieval_method: String,
    /// Serialized as fractional milliseconds under `latency_ms`
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    /// Corpus size of the snapshot that was searched
    pub total_candidates: usize,
    pub index_version: u64,
}

impl RetrievalResult {
    pub fn latency_ms(&self) -> f64 {
        millis(self.latency)
    }

    /// Document contents in rank order.
    pub fn contexts(&self) -> Vec<&str> {
        self.documents.iter().map(|d| d.content.as_str()).collect()
    }
}

fn millis(latency: Duration) -> f64 {
    latency.as_nanos() as f64 / 1_000_000.0
}

fn serialize_millis<S: Serializer>(latency: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(millis(*latency))
}

/// Outcome of an ingestion batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub inserted: usize,
    pub updated: usize,
    pub total_documents: usize,
    pub index_version: u64,
}

fn method_name(mode: SearchMode) -> &'static str {
    match mode {
        SearchMode::Hybrid => "hybrid_rrf",
        SearchMode::Vector => "dense",
        SearchMode::Bm25 => "sparse",
    }
}

fn check_deadline(deadline: Option<Instant>, phase: RetrievalPhase) -> Result<()> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => {
            debug!(%phase, "Retrieval deadline exceeded");
            Err(RetrievalError::DeadlineExceeded(phase))
        }
        _ => Ok(()),
    }
}

/// Reject a batch before any mutation: ids unique and non-empty, embeddings
/// present, finite and of one dimension.
fn validate_batch(batch: &[IngestDocument], dimension: Option<usize>) -> Result<()> {
    let mut seen = HashSet::with_capacity(batch.len());
    let mut expected = dimension;

    for record in batch {
        if record.id.is_empty() {
            return Err(RetrievalError::EmptyId);
        }
        if !seen.insert(record.id.as_str()) {
            return Err(RetrievalError::DuplicateId(record.id.clone()));
        }
        let embedding = record.embedding.as_deref().unwrap_or_default();
        check_embedding(&record.id, embedding, expected)?;
        expected.get_or_insert(embedding.len());
    }
    Ok(())
}

/// Hybrid retriever combining dense and sparse search through RRF.
pub struct Retriever {
    config: RetrievalConfig,
    fusion: RrfFusion,
    weights: FusionWeights,
    snapshot: RwLock<Arc<IndexSnapshot>>,
    writer: Mutex<()>,
}

impl Retriever {
    /// Create an empty retriever using the configured stopword tokenizer.
    pub fn new(config: RetrievalConfig, lexical: &LexicalConfig) -> Result<Self> {
        lexical.validate()?;
        Self::with_tokenizer(config, Bm25Params::from(lexical), tokenizer_from_config(lexical))
    }

    /// Create an empty retriever with a custom tokenization policy.
    pub fn with_tokenizer(
        config: RetrievalConfig,
        params: Bm25Params,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self> {
        config.validate()?;
        let fusion = RrfFusion::with_k(config.rrf_k)?;
        let weights = FusionWeights {
            dense: config.dense_weight,
            sparse: config.sparse_weight,
        };

        Ok(Self {
            config,
            fusion,
            weights,
            snapshot: RwLock::new(Arc::new(IndexSnapshot::empty(tokenizer, params))),
            writer: Mutex::new(()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.retrieval.clone(), &config.lexical)
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    /// The currently published snapshot. Never changes underneath the caller.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.snapshot.read().clone()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Document>> {
        self.snapshot().documents.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.snapshot().dimension()
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, ()>> {
        let timeout = self.config.write_timeout();
        self.writer.try_lock_for(timeout).ok_or_else(|| {
            WRITE_CONFLICTS.inc();
            warn!(
                waited_ms = timeout.as_millis() as u64,
                "Timed out waiting for write access"
            );
            RetrievalError::WriteConflict {
                waited_ms: timeout.as_millis() as u64,
            }
        })
    }

    fn publish(&self, next: IndexSnapshot, started: Instant) {
        let total = next.len();
        *self.snapshot.write() = Arc::new(next);

        INGEST_BATCHES.inc();
        INGEST_LATENCY.observe(started.elapsed().as_secs_f64());
        INDEXED_DOCUMENTS.set(total as f64);
    }

    /// Add or replace a batch of documents.
    ///
    /// The whole batch is validated first; any error rejects it with no
    /// change to the published index. Re-adding an id replaces its content,
    /// metadata and embedding together.
    pub fn add_documents(&self, batch: Vec<IngestDocument>) -> Result<IngestReport> {
        let started = Instant::now();
        let _guard = self.lock_writer()?;
        let current = self.snapshot();

        if batch.is_empty() {
            return Ok(IngestReport {
                inserted: 0,
                updated: 0,
                total_documents: current.len(),
                index_version: current.version,
            });
        }

        if let Err(e) = validate_batch(&batch, current.dimension()) {
            REJECTED_BATCHES.inc();
            warn!(batch_size = batch.len(), error = %e, "Rejected ingestion batch");
            return Err(e);
        }

        let mut next = IndexSnapshot::clone(&current);
        let pairs: Vec<(&str, &str)> = batch
            .iter()
            .map(|r| (r.id.as_str(), r.content.as_str()))
            .collect();
        next.lexical.index_documents(&pairs);

        let mut inserted = 0;
        let mut updated = 0;
        for record in &batch {
            let embedding = record.embedding.as_deref().unwrap_or_default();
            let document = Document {
                id: record.id.clone(),
                content: record.content.clone(),
                metadata: record.metadata.clone(),
            };
            match next.documents.upsert(document, embedding)? {
                Some(_) => updated += 1,
                None => inserted += 1,
            }
            next.vector.insert(&record.id, embedding)?;
        }
        next.version += 1;

        let report = IngestReport {
            inserted,
            updated,
            total_documents: next.len(),
            index_version: next.version,
        };
        self.publish(next, started);

        info!(
            inserted = report.inserted,
            updated = report.updated,
            total_documents = report.total_documents,
            version = report.index_version,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Indexed document batch"
        );
        Ok(report)
    }

    /// Remove a batch of documents from the store and both indices.
    ///
    /// Unknown or repeated ids reject the whole batch. Returns the number
    /// removed. The embedding dimension stays fixed even if the corpus empties.
    pub fn remove_documents<S: AsRef<str>>(&self, ids: &[S]) -> Result<usize> {
        let started = Instant::now();
        let _guard = self.lock_writer()?;
        let current = self.snapshot();

        if ids.is_empty() {
            return Ok(0);
        }

        let mut seen = HashSet::with_capacity(ids.len());
        for id in ids.iter().map(AsRef::as_ref) {
            let error = if id.is_empty() {
                Some(RetrievalError::EmptyId)
            } else if !seen.insert(id) {
                Some(RetrievalError::DuplicateId(id.to_string()))
            } else if !current.documents.contains(id) {
                Some(RetrievalError::UnknownId(id.to_string()))
            } else {
                None
            };
            if let Some(e) = error {
                REJECTED_BATCHES.inc();
                warn!(batch_size = ids.len(), error = %e, "Rejected removal batch");
                return Err(e);
            }
        }

        let mut next = IndexSnapshot::clone(&current);
        for id in ids.iter().map(AsRef::as_ref) {
            next.documents.remove(id);
            next.vector.remove(id);
        }
        next.lexical.remove_documents(ids);
        next.version += 1;

        let version = next.version;
        let total = next.len();
        self.publish(next, started);

        info!(
            removed = ids.len(),
            total_documents = total,
            version,
            "Removed document batch"
        );
        Ok(ids.len())
    }

    /// Retrieve ranked documents for a query.
    ///
    /// Runs against the snapshot current at call time. An empty corpus
    /// yields an empty result with zero latency rather than an error.
    pub fn retrieve(&self, request: &RetrievalRequest<'_>) -> Result<RetrievalResult> {
        let started = Instant::now();
        RETRIEVAL_REQUESTS.inc();

        let snapshot = self.snapshot();
        let top_k = request.top_k.unwrap_or(self.config.top_k);
        let multiplier = request
            .candidate_multiplier
            .unwrap_or(self.config.candidate_multiplier);
        let mode = request.mode.unwrap_or(self.config.mode);

        if multiplier == 0 {
            return Err(RetrievalError::InvalidRequest(
                "candidate_multiplier must be at least 1".to_string(),
            ));
        }

        if snapshot.is_empty() {
            return Ok(RetrievalResult {
                documents: Vec::new(),
                query: request.query_text.to_string(),
                retrieval_method: method_name(mode).to_string(),
                latency: Duration::ZERO,
                total_candidates: 0,
                index_version: snapshot.version,
            });
        }

        let documents = match mode {
            SearchMode::Vector => {
                check_deadline(request.deadline, RetrievalPhase::Dense)?;
                let dense = snapshot.vector.dense_search(request.query_vector, top_k)?;
                materialize_ranked(&snapshot, dense, SourceTag::Dense)
            }
            SearchMode::Bm25 => {
                check_deadline(request.deadline, RetrievalPhase::Sparse)?;
                let sparse = snapshot.lexical.sparse_search(request.query_text, top_k);
                materialize_ranked(&snapshot, sparse, SourceTag::Sparse)
            }
            SearchMode::Hybrid => {
                let fetch = top_k.saturating_mul(multiplier);

                check_deadline(request.deadline, RetrievalPhase::Dense)?;
                let dense = snapshot.vector.dense_search(request.query_vector, fetch)?;

                check_deadline(request.deadline, RetrievalPhase::Sparse)?;
                let sparse = snapshot.lexical.sparse_search(request.query_text, fetch);

                check_deadline(request.deadline, RetrievalPhase::Fusion)?;
                debug!(
                    dense_candidates = dense.len(),
                    sparse_candidates = sparse.len(),
                    "Fusing candidate lists"
                );
                let fused = self.fusion.fuse(&dense, &sparse, self.weights, top_k);
                materialize_fused(&snapshot, fused)
            }
        };

        let latency = started.elapsed();
        RETRIEVAL_LATENCY.observe(latency.as_secs_f64());
        RETRIEVAL_RESULTS.observe(documents.len() as f64);

        info!(
            search_type = %mode,
            results = documents.len(),
            total_candidates = snapshot.len(),
            version = snapshot.version,
            elapsed_ms = latency.as_millis() as u64,
            "Retrieval completed"
        );

        Ok(RetrievalResult {
            documents,
            query: request.query_text.to_string(),
            retrieval_method: method_name(mode).to_string(),
            latency,
            total_candidates: snapshot.len(),
            index_version: snapshot.version,
        })
    }
}

fn retrieved(snapshot: &IndexSnapshot, id: &str, score: f64, source: SourceTag) -> Option<RetrievedDocument> {
    let document = snapshot.documents.get(id)?;
    Some(RetrievedDocument {
        id: document.id.clone(),
        content: document.content.clone(),
        score,
        metadata: document.metadata.clone(),
        source,
    })
}

fn materialize_ranked(
    snapshot: &IndexSnapshot,
    candidates: Vec<RankedCandidate>,
    source: SourceTag,
) -> Vec<RetrievedDocument> {
    candidates
        .into_iter()
        .filter_map(|c| retrieved(snapshot, &c.document_id, c.score, source))
        .collect()
}

fn materialize_fused(snapshot: &IndexSnapshot, fused: Vec<FusedCandidate>) -> Vec<RetrievedDocument> {
    fused
        .into_iter()
        .filter_map(|c| retrieved(snapshot, &c.document_id, c.score, SourceTag::Fused))
        .collect()
}
