//! Canonical document records and the store that owns them.

mod corpus;
mod document_store;

pub(crate) use document_store::check_embedding;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use corpus::{parse_corpus, read_corpus};
pub use document_store::DocumentStore;

/// Ordered document metadata.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A stored document. Immutable once stored; replaced only by an upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// One ingestion record: a document plus the embedding supplied by the
/// embedding provider.
///
/// Deserializes from one JSON object per line of a corpus file. `embedding`
/// may be omitted when the record goes through a
/// [`RetrievalPipeline`](crate::pipeline::RetrievalPipeline), which fills it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestDocument {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl IngestDocument {
    pub fn new(id: impl Into<String>, content: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
            embedding: Some(embedding),
        }
    }

    /// A record whose embedding is still to be generated.
    pub fn without_embedding(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: Metadata::new(),
            embedding: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
