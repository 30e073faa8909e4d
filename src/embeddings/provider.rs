use anyhow::Result;
use async_trait::async_trait;

/// Core trait for embedding providers
///
/// The retriever never calls a provider itself; vectors are computed before
/// ingestion and before retrieval. Implementations must return vectors of
/// `embedding_dimension()` length and must be safe to call concurrently.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text (document or query)
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the dimension of embeddings produced by this provider
    fn embedding_dimension(&self) -> usize;

    /// Get provider name for logging and cache keys
    fn provider_name(&self) -> &'static str;

    /// Get maximum batch size this provider supports
    fn max_batch_size(&self) -> usize;
}
