//! Text-in retrieval on top of a [`Retriever`] and an [`EmbeddingProvider`].
//!
//! The retriever only accepts precomputed vectors. The pipeline fills in
//! missing document embeddings before ingestion and embeds query text before
//! retrieval. Provider failures abort before the index is touched.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{Config, SearchMode};
use crate::embeddings::{create_embedding_provider, EmbeddingProvider};
use crate::search::{
    IngestReport, RetrievalRequest, RetrievalResult, RetrievedDocument, Retriever, Search,
};
use crate::storage::IngestDocument;

pub struct RetrievalPipeline {
    retriever: Arc<Retriever>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl RetrievalPipeline {
    pub fn new(retriever: Arc<Retriever>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            retriever,
            embedder,
        }
    }

    /// Build an empty retriever and the configured embedding provider.
    pub fn from_config(config: &Config) -> Result<Self> {
        let retriever = Retriever::from_config(config).context("Invalid retrieval configuration")?;
        Ok(Self::new(
            Arc::new(retriever),
            create_embedding_provider(config),
        ))
    }

    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.retriever
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed records that arrive without a vector, then ingest the batch.
    pub async fn ingest(&self, mut documents: Vec<IngestDocument>) -> Result<IngestReport> {
        let missing: Vec<usize> = documents
            .iter()
            .enumerate()
            .filter(|(_, d)| d.embedding.is_none())
            .map(|(i, _)| i)
            .collect();

        if !missing.is_empty() {
            let batch_size = self.embedder.max_batch_size().max(1);
            debug!(
                provider = self.embedder.provider_name(),
                documents = missing.len(),
                batch_size,
                "Embedding documents"
            );

            for chunk in missing.chunks(batch_size) {
                let texts: Vec<String> = chunk.iter().map(|&i| documents[i].content.clone()).collect();
                let vectors = self
                    .embedder
                    .embed_batch(&texts)
                    .await
                    .with_context(|| format!("{} failed to embed documents", self.embedder.provider_name()))?;

                if vectors.len() != chunk.len() {
                    return Err(anyhow!(
                        "Embedding provider returned {} vectors for {} documents",
                        vectors.len(),
                        chunk.len()
                    ));
                }
                for (&i, vector) in chunk.iter().zip(vectors) {
                    documents[i].embedding = Some(vector);
                }
            }
        }

        // The writer may block up to the configured write timeout.
        let retriever = Arc::clone(&self.retriever);
        let report = tokio::task::spawn_blocking(move || retriever.add_documents(documents))
            .await
            .context("Ingestion task panicked")??;

        info!(
            inserted = report.inserted,
            updated = report.updated,
            version = report.index_version,
            "Pipeline ingestion completed"
        );
        Ok(report)
    }

    /// Remove documents by id.
    pub async fn remove(&self, ids: Vec<String>) -> Result<usize> {
        let retriever = Arc::clone(&self.retriever);
        let removed = tokio::task::spawn_blocking(move || retriever.remove_documents(ids.as_slice()))
            .await
            .context("Removal task panicked")??;
        Ok(removed)
    }

    /// Embed `query` and retrieve with the configured defaults.
    pub async fn retrieve(
        &self,
        query: &str,
        top_k: Option<usize>,
        mode: Option<SearchMode>,
    ) -> Result<RetrievalResult> {
        let mode = mode.unwrap_or(self.retriever.config().mode);

        // BM25 mode never reads the query vector.
        let vector = if mode == SearchMode::Bm25 {
            Vec::new()
        } else {
            self.embedder
                .embed(query)
                .await
                .with_context(|| format!("{} failed to embed query", self.embedder.provider_name()))?
        };

        let mut request = RetrievalRequest::new(query, &vector).with_mode(mode);
        if let Some(top_k) = top_k {
            request = request.with_top_k(top_k);
        }

        Ok(self.retriever.retrieve(&request)?)
    }
}

#[async_trait]
impl Search for RetrievalPipeline {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<RetrievedDocument>> {
        let result = self.retrieve(query, Some(limit), None).await?;
        Ok(result.documents)
    }

    fn search_type(&self) -> &'static str {
        match self.retriever.config().mode {
            SearchMode::Vector => "vector",
            SearchMode::Bm25 => "bm25",
            SearchMode::Hybrid => "hybrid",
        }
    }
}
