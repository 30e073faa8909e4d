//! Reciprocal Rank Fusion of a dense and a sparse ranking.
//!
//! RRF uses only rank positions, so the incomparable score scales of cosine
//! similarity and BM25 never meet. A document ranked consistently well in both
//! lists outranks one that is first in a single list.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::traits::{compare_scored, RankedCandidate};
use crate::error::{Result, RetrievalError};

/// Default RRF constant (k parameter).
///
/// Higher values make the ranking smoother, lower values emphasize top ranks more.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Default weight for dense results.
pub const DEFAULT_DENSE_WEIGHT: f64 = 0.7;

/// Default weight for sparse results.
pub const DEFAULT_SPARSE_WEIGHT: f64 = 0.3;

/// Per-source RRF weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub dense: f64,
    pub sparse: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            dense: DEFAULT_DENSE_WEIGHT,
            sparse: DEFAULT_SPARSE_WEIGHT,
        }
    }
}

/// A fused result with the ranks it held in each input list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedCandidate {
    pub document_id: String,
    pub score: f64,
    pub dense_rank: Option<usize>,
    pub sparse_rank: Option<usize>,
}

/// Reciprocal Rank Fusion (RRF) algorithm.
///
/// Each list contributes `weight / (k + rank + 1)` per document, with `rank`
/// the 0-based position in that list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RrfFusion {
    /// The k constant in the RRF formula
    k: f64,
}

impl RrfFusion {
    /// Create RRF with default k=60.
    pub fn new() -> Self {
        Self { k: DEFAULT_RRF_K }
    }

    /// Create RRF with custom k value.
    pub fn with_k(k: f64) -> Result<Self> {
        if !(k.is_finite() && k > 0.0) {
            return Err(RetrievalError::InvalidConfig(format!(
                "rrf_k must be positive, got {}",
                k
            )));
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// Fuse a dense and a sparse ranking.
    ///
    /// List position is the rank; the `rank` field of the inputs is ignored.
    /// Inputs are borrowed and left untouched. Ties on the summed score break
    /// by ascending document id, and the output is truncated to `top_k`.
    pub fn fuse(
        &self,
        dense: &[RankedCandidate],
        sparse: &[RankedCandidate],
        weights: FusionWeights,
        top_k: usize,
    ) -> Vec<FusedCandidate> {
        let mut fused: HashMap<&str, FusedCandidate> = HashMap::new();

        for (rank, candidate) in dense.iter().enumerate() {
            let contribution = weights.dense / (self.k + rank as f64 + 1.0);
            let entry = fused
                .entry(candidate.document_id.as_str())
                .or_insert_with(|| empty_candidate(&candidate.document_id));
            entry.score += contribution;
            entry.dense_rank.get_or_insert(rank);
        }

        for (rank, candidate) in sparse.iter().enumerate() {
            let contribution = weights.sparse / (self.k + rank as f64 + 1.0);
            let entry = fused
                .entry(candidate.document_id.as_str())
                .or_insert_with(|| empty_candidate(&candidate.document_id));
            entry.score += contribution;
            entry.sparse_rank.get_or_insert(rank);
        }

        let mut sorted: Vec<FusedCandidate> = fused.into_values().collect();
        sorted.sort_by(|a, b| {
            compare_scored((a.document_id.as_str(), a.score), (b.document_id.as_str(), b.score))
        });
        sorted.truncate(top_k);
        sorted
    }
}

impl Default for RrfFusion {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_candidate(document_id: &str) -> FusedCandidate {
    FusedCandidate {
        document_id: document_id.to_string(),
        score: 0.0,
        dense_rank: None,
        sparse_rank: None,
    }
}

/// Compute RRF score for a single result across multiple rankings.
///
/// # Arguments
/// * `ranks` - (rank, weight) pairs where rank is 0-indexed
/// * `k` - RRF constant (typically 60)
pub fn rrf_score(ranks: &[(usize, f64)], k: f64) -> f64 {
    ranks
        .iter()
        .map(|(rank, weight)| weight / (k + *rank as f64 + 1.0))
        .sum()
}
