mod cache;
mod hashing;
mod provider;

// Re-export public interfaces
pub use cache::CachedEmbedder;
pub use hashing::HashingEmbedder;
pub use provider::EmbeddingProvider;

use std::sync::Arc;

use crate::config::Config;

/// Build the default provider described by the configuration.
pub fn create_embedding_provider(config: &Config) -> Arc<dyn EmbeddingProvider> {
    let embedder = HashingEmbedder::from_config(&config.embeddings, &config.lexical);
    if config.embeddings.cache_enabled {
        Arc::new(CachedEmbedder::with_capacity(
            embedder,
            config.embeddings.cache_max_entries,
        ))
    } else {
        Arc::new(embedder)
    }
}
