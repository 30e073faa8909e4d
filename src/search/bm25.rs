//! BM25 keyword search over an in-memory term index.
//!
//! Per-document term frequencies and lengths are computed when a document is
//! indexed. Corpus-global statistics (document frequency, IDF, average
//! document length) are derived state: every public mutation rebuilds them
//! from the per-document data once per batch before returning.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::tokenizer::Tokenizer;
use super::traits::{rank_top_k, RankedCandidate};
use crate::config::LexicalConfig;

/// BM25 scoring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    /// Term frequency saturation
    pub k1: f64,
    /// Length normalization strength
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

impl From<&LexicalConfig> for Bm25Params {
    fn from(config: &LexicalConfig) -> Self {
        Self {
            k1: config.k1,
            b: config.b,
        }
    }
}

/// `ln((N - df + 0.5) / (df + 0.5) + 1)`, always positive.
pub fn bm25_idf(total_documents: usize, document_frequency: usize) -> f64 {
    let n = total_documents as f64;
    let df = document_frequency as f64;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Term statistics of a single document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentTerms {
    pub term_frequencies: HashMap<String, u32>,
    /// Token count after filtering
    pub length: usize,
}

impl DocumentTerms {
    pub fn from_tokens(tokens: Vec<String>) -> Self {
        let length = tokens.len();
        let mut term_frequencies = HashMap::new();
        for token in tokens {
            *term_frequencies.entry(token).or_insert(0) += 1;
        }
        Self {
            term_frequencies,
            length,
        }
    }
}

/// Sparse lexical index answering BM25 queries.
#[derive(Clone)]
pub struct LexicalIndex {
    tokenizer: Arc<dyn Tokenizer>,
    params: Bm25Params,
    documents: HashMap<String, Arc<DocumentTerms>>,
    document_frequency: HashMap<String, usize>,
    idf: HashMap<String, f64>,
    avg_doc_length: f64,
}

impl fmt::Debug for LexicalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LexicalIndex")
            .field("params", &self.params)
            .field("documents", &self.documents.len())
            .field("vocabulary", &self.idf.len())
            .field("avg_doc_length", &self.avg_doc_length)
            .finish()
    }
}

impl LexicalIndex {
    pub fn new(tokenizer: Arc<dyn Tokenizer>, params: Bm25Params) -> Self {
        Self {
            tokenizer,
            params,
            documents: HashMap::new(),
            document_frequency: HashMap::new(),
            idf: HashMap::new(),
            avg_doc_length: 0.0,
        }
    }

    /// Tokenize with the index's policy.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokenizer.tokenize(text)
    }

    /// Index a batch, tokenizing in parallel, then recompute statistics once.
    ///
    /// Later entries win when an id repeats.
    pub fn index_documents(&mut self, batch: &[(&str, &str)]) {
        let tokenizer = &self.tokenizer;
        let staged: Vec<(String, DocumentTerms)> = batch
            .par_iter()
            .map(|(id, content)| {
                (
                    (*id).to_string(),
                    DocumentTerms::from_tokens(tokenizer.tokenize(content)),
                )
            })
            .collect();

        for (id, terms) in staged {
            self.documents.insert(id, Arc::new(terms));
        }
        self.recompute_statistics();
    }

    /// Drop a batch of documents, then recompute statistics once.
    ///
    /// Unknown ids are ignored. Returns how many documents were removed.
    pub fn remove_documents<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let removed = ids
            .iter()
            .filter(|id| self.documents.remove(id.as_ref()).is_some())
            .count();
        if removed > 0 {
            self.recompute_statistics();
        }
        removed
    }

    /// Rebuild document frequency, IDF and average length from scratch.
    fn recompute_statistics(&mut self) {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut total_length = 0usize;

        for terms in self.documents.values() {
            total_length += terms.length;
            for term in terms.term_frequencies.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
        }

        let total_documents = self.documents.len();
        self.idf = document_frequency
            .iter()
            .map(|(term, &df)| (term.clone(), bm25_idf(total_documents, df)))
            .collect();
        self.document_frequency = document_frequency;
        self.avg_doc_length = if total_documents > 0 {
            total_length as f64 / total_documents as f64
        } else {
            0.0
        };

        debug!(
            documents = total_documents,
            vocabulary = self.idf.len(),
            avg_doc_length = self.avg_doc_length,
            "Recomputed BM25 statistics"
        );
    }

    /// BM25 score of one document for already-tokenized query terms.
    ///
    /// Repeated query terms contribute once per occurrence; terms absent from
    /// the corpus contribute zero.
    pub fn score(&self, id: &str, query_terms: &[String]) -> f64 {
        let Some(terms) = self.documents.get(id) else {
            return 0.0;
        };

        let Bm25Params { k1, b } = self.params;
        let mut score = 0.0;
        for term in query_terms {
            let Some(&idf) = self.idf.get(term) else {
                continue;
            };
            let tf = terms.term_frequencies.get(term).copied().unwrap_or(0);
            if tf == 0 {
                continue;
            }
            // tf > 0 implies a non-empty corpus, so avg_doc_length > 0
            let tf = f64::from(tf);
            let length_norm = 1.0 - b + b * terms.length as f64 / self.avg_doc_length;
            score += idf * tf * (k1 + 1.0) / (tf + k1 * length_norm);
        }
        score
    }

    /// Top `k` documents by BM25 score, ties by ascending id.
    ///
    /// Every document is ranked, including those scoring zero, so a query
    /// whose terms are all filtered out still yields `k` ids in id order.
    pub fn sparse_search(&self, query: &str, k: usize) -> Vec<RankedCandidate> {
        if self.documents.is_empty() || k == 0 {
            return Vec::new();
        }

        let query_terms = self.tokenize(query);
        let scored: Vec<(String, f64)> = self
            .documents
            .keys()
            .map(|id| (id.clone(), self.score(id, &query_terms)))
            .collect();

        rank_top_k(scored, k)
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.idf.get(term).copied()
    }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.document_frequency.get(term).copied().unwrap_or(0)
    }

    pub fn avg_doc_length(&self) -> f64 {
        self.avg_doc_length
    }

    pub fn doc_length(&self, id: &str) -> Option<usize> {
        self.documents.get(id).map(|t| t.length)
    }

    pub fn term_frequency(&self, id: &str, term: &str) -> u32 {
        self.documents
            .get(id)
            .and_then(|t| t.term_frequencies.get(term).copied())
            .unwrap_or(0)
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
