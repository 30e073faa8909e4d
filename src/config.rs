use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::RetrievalError;

const CONFIG_DIR: &str = ".hybridrag";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub lexical: LexicalConfig,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Search mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Dense-only cosine similarity search
    Vector,
    /// Sparse-only BM25 keyword search
    Bm25,
    /// Both searches fused with RRF
    #[default]
    Hybrid,
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Vector => write!(f, "vector"),
            SearchMode::Bm25 => write!(f, "bm25"),
            SearchMode::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "vector" | "dense" => Ok(SearchMode::Vector),
            "bm25" | "sparse" => Ok(SearchMode::Bm25),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(format!(
                "unknown search mode '{}', expected vector, bm25 or hybrid",
                other
            )),
        }
    }
}

/// Fusion and orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Search mode: vector, bm25, or hybrid
    #[serde(default)]
    pub mode: SearchMode,

    /// RRF weight of the dense ranking
    #[serde(default = "default_dense_weight")]
    pub dense_weight: f64,

    /// RRF weight of the sparse ranking
    #[serde(default = "default_sparse_weight")]
    pub sparse_weight: f64,

    /// RRF k constant (higher = smoother rank influence)
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f64,

    /// Default number of results to return
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Each source is asked for `top_k * candidate_multiplier` candidates
    #[serde(default = "default_candidate_multiplier")]
    pub candidate_multiplier: usize,

    /// How long a writer waits for exclusive access before reporting a conflict
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            mode: SearchMode::default(),
            dense_weight: default_dense_weight(),
            sparse_weight: default_sparse_weight(),
            rrf_k: default_rrf_k(),
            top_k: default_top_k(),
            candidate_multiplier: default_candidate_multiplier(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

impl RetrievalConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn validate(&self) -> std::result::Result<(), RetrievalError> {
        let weights_valid = |w: f64| w.is_finite() && w >= 0.0;
        if !weights_valid(self.dense_weight) || !weights_valid(self.sparse_weight) {
            return Err(RetrievalError::InvalidConfig(format!(
                "fusion weights must be finite and non-negative (dense={}, sparse={})",
                self.dense_weight, self.sparse_weight
            )));
        }
        if self.dense_weight == 0.0 && self.sparse_weight == 0.0 {
            return Err(RetrievalError::InvalidConfig(
                "at least one fusion weight must be positive".to_string(),
            ));
        }
        if !(self.rrf_k.is_finite() && self.rrf_k > 0.0) {
            return Err(RetrievalError::InvalidConfig(format!(
                "rrf_k must be positive, got {}",
                self.rrf_k
            )));
        }
        if self.top_k == 0 {
            return Err(RetrievalError::InvalidConfig(
                "top_k must be at least 1".to_string(),
            ));
        }
        if self.candidate_multiplier == 0 {
            return Err(RetrievalError::InvalidConfig(
                "candidate_multiplier must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_dense_weight() -> f64 {
    0.7
}

fn default_sparse_weight() -> f64 {
    0.3
}

fn default_rrf_k() -> f64 {
    60.0
}

fn default_top_k() -> usize {
    10
}

fn default_candidate_multiplier() -> usize {
    2
}

fn default_write_timeout_ms() -> u64 {
    5000
}

/// BM25 and tokenizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexicalConfig {
    /// Term frequency saturation
    #[serde(default = "default_k1")]
    pub k1: f64,

    /// Document length normalization strength, in [0, 1]
    #[serde(default = "default_b")]
    pub b: f64,

    /// Tokens with fewer characters are dropped
    #[serde(default = "default_min_token_length")]
    pub min_token_length: usize,

    /// Replaces the built-in English stopword list when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopwords: Option<Vec<String>>,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            k1: default_k1(),
            b: default_b(),
            min_token_length: default_min_token_length(),
            stopwords: None,
        }
    }
}

impl LexicalConfig {
    pub fn validate(&self) -> std::result::Result<(), RetrievalError> {
        if !(self.k1.is_finite() && self.k1 >= 0.0) {
            return Err(RetrievalError::InvalidConfig(format!(
                "k1 must be non-negative, got {}",
                self.k1
            )));
        }
        if !(0.0..=1.0).contains(&self.b) {
            return Err(RetrievalError::InvalidConfig(format!(
                "b must be within [0, 1], got {}",
                self.b
            )));
        }
        if self.min_token_length == 0 {
            return Err(RetrievalError::InvalidConfig(
                "min_token_length must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_k1() -> f64 {
    1.5
}

fn default_b() -> f64 {
    0.75
}

fn default_min_token_length() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    /// Dimension of the built-in hashing embedder
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Memoize embeddings per text
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Cached vectors kept before new texts stop being memoized
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            batch_size: default_batch_size(),
            cache_enabled: default_cache_enabled(),
            cache_max_entries: default_cache_max_entries(),
        }
    }
}

fn default_dimension() -> usize {
    256
}

fn default_batch_size() -> usize {
    32
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_max_entries() -> usize {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write logs to rolling files
    #[serde(default)]
    pub enabled: bool,

    /// Write logs to stderr
    #[serde(default = "default_log_stderr")]
    pub stderr: bool,

    /// Level for the file layer: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory (relative paths resolve against the project root)
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// Rotation: minutely, hourly, daily, never
    #[serde(default = "default_log_rotation")]
    pub rotation: String,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stderr: default_log_stderr(),
            level: default_log_level(),
            directory: default_log_directory(),
            rotation: default_log_rotation(),
            file_prefix: default_log_file_prefix(),
        }
    }
}

fn default_log_stderr() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from(".hybridrag/logs")
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

fn default_log_file_prefix() -> String {
    "hybridrag.log".to_string()
}

impl Config {
    /// Load configuration from the .hybridrag directory
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = Self::config_path(root);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", config_path))?;
            config
                .validate()
                .with_context(|| format!("Invalid config in {:?}", config_path))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to the .hybridrag directory
    pub fn save(&self, root: &Path) -> Result<()> {
        let config_dir = Self::config_dir(root);
        let config_path = config_dir.join(CONFIG_FILE);

        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;

        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Check every section; the first violation wins.
    pub fn validate(&self) -> std::result::Result<(), RetrievalError> {
        self.retrieval.validate()?;
        self.lexical.validate()?;
        if self.embeddings.dimension == 0 {
            return Err(RetrievalError::InvalidConfig(
                "embedding dimension must be at least 1".to_string(),
            ));
        }
        if self.embeddings.batch_size == 0 {
            return Err(RetrievalError::InvalidConfig(
                "embedding batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the path to the .hybridrag directory
    pub fn config_dir(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR)
    }

    pub fn config_path(root: &Path) -> PathBuf {
        Self::config_dir(root).join(CONFIG_FILE)
    }

    /// Check if a config file exists under the given directory
    pub fn is_initialized(root: &Path) -> bool {
        Self::config_path(root).exists()
    }
}
