use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::provider::EmbeddingProvider;

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

type CacheMap = HashMap<(&'static str, String), Vec<f32>>;

/// Memoizing wrapper around another provider.
///
/// Vectors are keyed by provider name and text. Batches only send cache
/// misses to the inner provider. The map holds at most `max_entries`
/// vectors; once full, new texts are still embedded but not remembered,
/// and only [`clear_cache`](Self::clear_cache) frees space.
pub struct CachedEmbedder<P> {
    inner: P,
    max_entries: usize,
    cache: Arc<RwLock<CacheMap>>,
}

impl<P: EmbeddingProvider> CachedEmbedder<P> {
    pub fn new(inner: P) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: P, max_entries: usize) -> Self {
        Self {
            inner,
            max_entries,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn remember(&self, cache: &mut CacheMap, key: (&'static str, String), vector: Vec<f32>) {
        if cache.len() < self.max_entries || cache.contains_key(&key) {
            cache.insert(key, vector);
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.read().await.len()
    }
}

#[async_trait]
impl<P: EmbeddingProvider> EmbeddingProvider for CachedEmbedder<P> {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = (self.inner.provider_name(), text.to_string());
        if let Some(vector) = self.cache.read().await.get(&key) {
            return Ok(vector.clone());
        }

        let vector = self.inner.embed(text).await?;
        let mut cache = self.cache.write().await;
        self.remember(&mut cache, key, vector.clone());
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let name = self.inner.provider_name();
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut misses = Vec::new();

        {
            let cache = self.cache.read().await;
            for text in texts {
                let hit = cache.get(&(name, text.clone())).cloned();
                if hit.is_none() {
                    misses.push(text.clone());
                }
                results.push(hit);
            }
        }

        if !misses.is_empty() {
            debug!(
                provider = name,
                hits = texts.len() - misses.len(),
                misses = misses.len(),
                "Embedding cache misses"
            );
            let computed = self.inner.embed_batch(&misses).await?;
            if computed.len() != misses.len() {
                return Err(anyhow!(
                    "Provider {} returned {} embeddings for {} texts",
                    name,
                    computed.len(),
                    misses.len()
                ));
            }

            let mut cache = self.cache.write().await;
            let mut computed = computed.into_iter();
            for (text, slot) in texts.iter().zip(results.iter_mut()) {
                if slot.is_none() {
                    // Same text repeated within one batch was sent once per occurrence.
                    if let Some(vector) = computed.next() {
                        self.remember(&mut cache, (name, text.clone()), vector.clone());
                        *slot = Some(vector);
                    }
                }
            }
        }

        results
            .into_iter()
            .map(|v| v.ok_or_else(|| anyhow!("Missing embedding in batch result")))
            .collect()
    }

    fn embedding_dimension(&self) -> usize {
        self.inner.embedding_dimension()
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }

    fn max_batch_size(&self) -> usize {
        self.inner.max_batch_size()
    }
}
