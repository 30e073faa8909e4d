//! Tokenization policy for lexical indexing and queries.
//!
//! The same policy must be applied to documents and queries, so the lexical
//! index owns one `Arc<dyn Tokenizer>` and uses it for both.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;

use crate::config::LexicalConfig;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"\w+").expect("word pattern is valid");
}

/// Built-in English stopword list.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "could", "should", "may", "might", "must", "shall",
    "can", "of", "to", "in", "for", "on", "with", "at", "by", "from", "as", "into", "through",
    "during", "before", "after", "above", "below", "between", "under", "again", "further",
    "then", "once", "here", "there", "when", "where", "why", "how", "all", "each", "few",
    "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so",
    "than", "too", "very", "just", "and", "but", "if", "or", "because", "until", "while",
    "this", "that", "these", "those",
];

/// Turns text into index terms.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Any `Fn(&str) -> Vec<String>` is a tokenizer.
impl<F> Tokenizer for F
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn tokenize(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

/// Lower-cases, extracts word tokens, drops stopwords and short tokens.
#[derive(Debug, Clone)]
pub struct StopwordTokenizer {
    stopwords: HashSet<String>,
    min_token_length: usize,
}

impl StopwordTokenizer {
    pub fn new<I, S>(stopwords: I, min_token_length: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            stopwords: stopwords
                .into_iter()
                .map(|s| s.into().to_lowercase())
                .collect(),
            min_token_length,
        }
    }

    /// English stopwords, tokens of at least 3 characters.
    pub fn english() -> Self {
        Self::new(DEFAULT_STOPWORDS.iter().copied(), 3)
    }

    pub fn from_config(config: &LexicalConfig) -> Self {
        match &config.stopwords {
            Some(words) => Self::new(words.iter().cloned(), config.min_token_length),
            None => Self::new(DEFAULT_STOPWORDS.iter().copied(), config.min_token_length),
        }
    }

    pub fn min_token_length(&self) -> usize {
        self.min_token_length
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.stopwords.contains(token)
    }
}

impl Default for StopwordTokenizer {
    fn default() -> Self {
        Self::english()
    }
}

impl Tokenizer for StopwordTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        WORD.find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| t.chars().count() >= self.min_token_length && !self.is_stopword(t))
            .map(str::to_string)
            .collect()
    }
}

/// Shared tokenizer built from the lexical config.
pub fn tokenizer_from_config(config: &LexicalConfig) -> Arc<dyn Tokenizer> {
    Arc::new(StopwordTokenizer::from_config(config))
}
