use std::collections::HashMap;
use std::sync::Arc;

use super::Document;
use crate::error::{Result, RetrievalError};

/// Validate one ingestion record's id and embedding against `expected`.
pub(crate) fn check_embedding(id: &str, embedding: &[f32], expected: Option<usize>) -> Result<()> {
    if id.is_empty() {
        return Err(RetrievalError::EmptyId);
    }
    if embedding.is_empty() {
        return Err(RetrievalError::MissingEmbedding { id: id.to_string() });
    }
    if let Some(expected) = expected {
        if embedding.len() != expected {
            return Err(RetrievalError::DimensionMismatch {
                id: id.to_string(),
                expected,
                actual: embedding.len(),
            });
        }
    }
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(RetrievalError::NonFiniteEmbedding { id: id.to_string() });
    }
    Ok(())
}

/// Ground truth for which documents exist.
///
/// Records are shared as `Arc<Document>` so that cloning the store for a new
/// index snapshot copies pointers, not content. The store also owns the
/// corpus-wide embedding dimension: the first accepted embedding fixes it.
#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    documents: HashMap<String, Arc<Document>>,
    dimension: Option<usize>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose embedding dimension is fixed up front.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            documents: HashMap::new(),
            dimension: Some(dimension),
        }
    }

    /// The fixed embedding dimension, once known.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Check an embedding against the store-wide dimension without mutating.
    pub fn check_embedding(&self, id: &str, embedding: &[f32]) -> Result<()> {
        check_embedding(id, embedding, self.dimension)
    }

    /// Insert or replace a document.
    ///
    /// Returns the record that was replaced, if any. The embedding is only
    /// validated here; it is stored by the vector index.
    pub fn upsert(&mut self, document: Document, embedding: &[f32]) -> Result<Option<Arc<Document>>> {
        self.check_embedding(&document.id, embedding)?;
        self.dimension.get_or_insert(embedding.len());

        let id = document.id.clone();
        Ok(self.documents.insert(id, Arc::new(document)))
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Document>> {
        self.documents.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<Arc<Document>> {
        self.documents.remove(id)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }
}
