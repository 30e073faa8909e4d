//! Exact cosine-similarity search over stored embeddings.

use std::collections::HashMap;
use std::sync::Arc;

use super::traits::{rank_top_k, RankedCandidate};
use crate::error::{Result, RetrievalError};

/// A stored embedding with its precomputed L2 norm.
#[derive(Debug, Clone)]
struct StoredVector {
    values: Arc<[f32]>,
    norm: f64,
}

fn l2_norm(values: &[f32]) -> f64 {
    values
        .iter()
        .map(|&v| f64::from(v) * f64::from(v))
        .sum::<f64>()
        .sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum()
}

/// Cosine similarity of two equal-length vectors; 0 when either norm is 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let norm_product = l2_norm(a) * l2_norm(b);
    if norm_product == 0.0 {
        return 0.0;
    }
    dot(a, b) / norm_product
}

/// Exhaustive dense index over document embeddings.
///
/// Every query is compared against every stored vector, so search cost is
/// linear in corpus size. An approximate index can replace this behind the
/// same `dense_search` contract.
#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dimension: Option<usize>,
    vectors: HashMap<String, StoredVector>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            vectors: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Insert or replace the embedding for `id`.
    ///
    /// The first insert fixes the dimension when none was configured.
    pub fn insert(&mut self, id: &str, embedding: &[f32]) -> Result<()> {
        if embedding.is_empty() {
            return Err(RetrievalError::MissingEmbedding { id: id.to_string() });
        }
        let expected = *self.dimension.get_or_insert(embedding.len());
        if embedding.len() != expected {
            return Err(RetrievalError::DimensionMismatch {
                id: id.to_string(),
                expected,
                actual: embedding.len(),
            });
        }

        self.vectors.insert(
            id.to_string(),
            StoredVector {
                norm: l2_norm(embedding),
                values: Arc::from(embedding),
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.vectors.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&[f32]> {
        self.vectors.get(id).map(|v| v.values.as_ref())
    }

    /// Top `k` documents by cosine similarity to `query`, ties by ascending id.
    ///
    /// An empty index yields an empty list whatever the query looks like.
    pub fn dense_search(&self, query: &[f32], k: usize) -> Result<Vec<RankedCandidate>> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if query.len() != expected {
                return Err(RetrievalError::QueryDimensionMismatch {
                    expected,
                    actual: query.len(),
                });
            }
        }
        if query.iter().any(|v| !v.is_finite()) {
            return Err(RetrievalError::NonFiniteQuery);
        }

        let query_norm = l2_norm(query);
        let scored: Vec<(String, f64)> = self
            .vectors
            .iter()
            .map(|(id, stored)| {
                let denominator = query_norm * stored.norm;
                let similarity = if denominator == 0.0 {
                    0.0
                } else {
                    dot(query, &stored.values) / denominator
                };
                (id.clone(), similarity)
            })
            .collect();

        Ok(rank_top_k(scored, k))
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}
