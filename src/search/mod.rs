//! Search module providing vector, BM25, and hybrid retrieval.
//!
//! This module contains:
//! - `traits` - Ranked candidates, deterministic ordering, and the `Search` trait
//! - `tokenizer` - Swappable tokenization policy for the lexical index
//! - `bm25` - BM25 lexical index with batch-recomputed statistics
//! - `vector` - Exact cosine-similarity vector index
//! - `hybrid` - Reciprocal Rank Fusion of the two rankings
//! - `retriever` - Snapshot-published orchestrator over all of the above

pub mod bm25;
pub mod hybrid;
pub mod retriever;
pub mod tokenizer;
pub mod traits;
pub mod vector;

// Re-export commonly used types
pub use bm25::{Bm25Params, LexicalIndex};
pub use hybrid::{FusedCandidate, FusionWeights, RrfFusion};
pub use retriever::{
    IndexSnapshot, IngestReport, RetrievalRequest, RetrievalResult, RetrievedDocument, Retriever,
};
pub use tokenizer::{StopwordTokenizer, Tokenizer};
pub use traits::{RankedCandidate, Search, SourceTag};
pub use vector::{cosine_similarity, VectorIndex};
