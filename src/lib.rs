pub mod cli;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod search;
pub mod storage;

pub use config::{Config, SearchMode};
pub use error::{RetrievalError, RetrievalPhase};
pub use pipeline::RetrievalPipeline;
pub use search::{IngestReport, RetrievalRequest, RetrievalResult, RetrievedDocument, Retriever};
pub use storage::{Document, IngestDocument, Metadata};
