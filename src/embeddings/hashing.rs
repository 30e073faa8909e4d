use anyhow::Result;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::provider::EmbeddingProvider;
use crate::config::{EmbeddingsConfig, LexicalConfig};
use crate::search::tokenizer::{tokenizer_from_config, StopwordTokenizer, Tokenizer};

/// Deterministic feature-hashing embedder.
///
/// Each token is hashed into one of `dimension` buckets with a hash-derived
/// sign, and the bucket counts are L2-normalized. Texts sharing vocabulary get
/// positive cosine similarity, which is enough for offline use and tests
/// without downloading a model.
pub struct HashingEmbedder {
    dimension: usize,
    batch_size: usize,
    tokenizer: Arc<dyn Tokenizer>,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            batch_size: 32,
            tokenizer: Arc::new(StopwordTokenizer::english()),
        }
    }

    pub fn from_config(embeddings: &EmbeddingsConfig, lexical: &LexicalConfig) -> Self {
        Self {
            dimension: embeddings.dimension.max(1),
            batch_size: embeddings.batch_size.max(1),
            tokenizer: tokenizer_from_config(lexical),
        }
    }

    fn text_to_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        for token in self.tokenizer.tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let hash = hasher.finish();

            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        // Normalize vector
        let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in vector.iter_mut() {
                *v /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.text_to_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.text_to_vector(t)).collect())
    }

    fn embedding_dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &'static str {
        "hashing"
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }
}
