//! Error types for the retrieval core.
//!
//! Validation errors reject an entire call before any index mutation and are
//! not retryable as-is. `WriteConflict` is the only transient error.

use thiserror::Error;

/// Result alias used throughout the retrieval core.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Phase of a retrieval at which a deadline check happens.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum RetrievalPhase {
    Dense,
    Sparse,
    Fusion,
}

impl std::fmt::Display for RetrievalPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalPhase::Dense => write!(f, "dense search"),
            RetrievalPhase::Sparse => write!(f, "sparse search"),
            RetrievalPhase::Fusion => write!(f, "fusion"),
        }
    }
}

/// Errors raised by the document store, the indices and the retriever.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrievalError {
    /// A document id was the empty string
    #[error("Document id must not be empty")]
    EmptyId,
    /// The same id appeared twice in one batch
    #[error("Duplicate document id in batch: {0}")]
    DuplicateId(String),
    /// A document arrived without an embedding
    #[error("Document '{id}' has no embedding")]
    MissingEmbedding { id: String },
    /// A document embedding does not match the index dimension
    #[error("Document '{id}' has embedding dimension {actual}, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },
    /// A document embedding contains NaN or infinity
    #[error("Document '{id}' has a non-finite embedding value")]
    NonFiniteEmbedding { id: String },
    /// A removal named an id that is not stored
    #[error("Unknown document id: {0}")]
    UnknownId(String),
    /// The query embedding does not match the index dimension
    #[error("Query embedding has dimension {actual}, expected {expected}")]
    QueryDimensionMismatch { expected: usize, actual: usize },
    /// The query embedding contains NaN or infinity
    #[error("Query embedding has a non-finite value")]
    NonFiniteQuery,
    /// Request parameters are out of range
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    /// Construction-time configuration is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Exclusive write access was not acquired within the bounded wait
    #[error("Could not acquire write access within {waited_ms}ms")]
    WriteConflict { waited_ms: u64 },
    /// The caller's deadline passed before the named phase started
    #[error("Deadline exceeded before {0}")]
    DeadlineExceeded(RetrievalPhase),
}

impl RetrievalError {
    /// Whether resubmitting the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RetrievalError::WriteConflict { .. })
    }

    /// Whether the input itself was rejected.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            RetrievalError::WriteConflict { .. } | RetrievalError::DeadlineExceeded(_)
        )
    }
}
