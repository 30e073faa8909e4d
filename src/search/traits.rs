//! Shared search types and the `Search` trait.
//!
//! This module defines the candidate records every index emits, the single
//! ordering rule all rankings share, and the text-in `Search` trait that
//! search front-ends implement.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::retriever::RetrievedDocument;

/// Common trait for text-in search front-ends.
///
/// Implementors own whatever is needed to turn raw query text into a
/// ranking (for example an embedding provider).
#[async_trait]
pub trait Search: Send + Sync {
    /// Search for relevant documents.
    ///
    /// # Arguments
    /// * `query` - The search query string
    /// * `limit` - Maximum number of results to return
    ///
    /// # Returns
    /// Documents sorted by relevance (highest score first)
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedDocument>>;

    /// Get the search type identifier, such as "vector", "bm25", or "hybrid".
    fn search_type(&self) -> &'static str;
}

/// Which ranking produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    Dense,
    Sparse,
    Fused,
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceTag::Dense => write!(f, "dense"),
            SourceTag::Sparse => write!(f, "sparse"),
            SourceTag::Fused => write!(f, "fused"),
        }
    }
}

/// A document id with its source-local score and 0-based rank.
///
/// Scores are only comparable within the list that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub document_id: String,
    pub score: f64,
    pub rank: usize,
}

/// Descending by score, then ascending by id.
pub fn compare_scored(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0))
}

/// Order scored ids deterministically and keep the best `k`.
pub fn rank_top_k(mut scored: Vec<(String, f64)>, k: usize) -> Vec<RankedCandidate> {
    scored.sort_by(|a, b| compare_scored((a.0.as_str(), a.1), (b.0.as_str(), b.1)));
    scored.truncate(k);

    scored
        .into_iter()
        .enumerate()
        .map(|(rank, (document_id, score))| RankedCandidate {
            document_id,
            score,
            rank,
        })
        .collect()
}
