//! Prometheus metrics for hybridrag
//!
//! This module provides observability through Prometheus-compatible metrics
//! for retrieval and ingestion.

use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Gauge, Histogram, HistogramOpts, Opts, Registry, TextEncoder};
use std::sync::Once;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // Retrieval metrics
    // ============================================================================

    /// Total number of retrieval requests
    pub static ref RETRIEVAL_REQUESTS: Counter = Counter::with_opts(
        Opts::new(
            "hybridrag_retrieval_requests_total",
            "Total number of retrieval requests"
        )
    ).expect("Failed to create RETRIEVAL_REQUESTS counter");

    /// Retrieval latency in seconds
    pub static ref RETRIEVAL_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "hybridrag_retrieval_latency_seconds",
            "Retrieval latency in seconds"
        ).buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0])
    ).expect("Failed to create RETRIEVAL_LATENCY histogram");

    /// Number of documents returned per retrieval
    pub static ref RETRIEVAL_RESULTS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "hybridrag_retrieval_results_count",
            "Number of documents returned per retrieval"
        ).buckets(vec![0.0, 1.0, 5.0, 10.0, 20.0, 50.0])
    ).expect("Failed to create RETRIEVAL_RESULTS histogram");

    // ============================================================================
    // Ingestion metrics
    // ============================================================================

    /// Documents in the most recently published index snapshot
    pub static ref INDEXED_DOCUMENTS: Gauge = Gauge::with_opts(
        Opts::new(
            "hybridrag_indexed_documents",
            "Documents in the most recently published index snapshot"
        )
    ).expect("Failed to create INDEXED_DOCUMENTS gauge");

    /// Write batches applied (ingestion and removal)
    pub static ref INGEST_BATCHES: Counter = Counter::with_opts(
        Opts::new(
            "hybridrag_ingest_batches_total",
            "Write batches applied"
        )
    ).expect("Failed to create INGEST_BATCHES counter");

    /// Time to apply a write batch in seconds
    pub static ref INGEST_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "hybridrag_ingest_duration_seconds",
            "Time to apply a write batch in seconds"
        ).buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0])
    ).expect("Failed to create INGEST_LATENCY histogram");

    /// Write batches rejected by validation
    pub static ref REJECTED_BATCHES: Counter = Counter::with_opts(
        Opts::new(
            "hybridrag_rejected_batches_total",
            "Write batches rejected by validation"
        )
    ).expect("Failed to create REJECTED_BATCHES counter");

    /// Writers that gave up waiting for exclusive access
    pub static ref WRITE_CONFLICTS: Counter = Counter::with_opts(
        Opts::new(
            "hybridrag_write_conflicts_total",
            "Writers that gave up waiting for exclusive access"
        )
    ).expect("Failed to create WRITE_CONFLICTS counter");
}

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry
///
/// Safe to call more than once; only the first call registers.
/// Panics if metrics registration fails.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(RETRIEVAL_REQUESTS.clone()))
            .expect("Failed to register RETRIEVAL_REQUESTS");
        REGISTRY
            .register(Box::new(RETRIEVAL_LATENCY.clone()))
            .expect("Failed to register RETRIEVAL_LATENCY");
        REGISTRY
            .register(Box::new(RETRIEVAL_RESULTS.clone()))
            .expect("Failed to register RETRIEVAL_RESULTS");
        REGISTRY
            .register(Box::new(INDEXED_DOCUMENTS.clone()))
            .expect("Failed to register INDEXED_DOCUMENTS");
        REGISTRY
            .register(Box::new(INGEST_BATCHES.clone()))
            .expect("Failed to register INGEST_BATCHES");
        REGISTRY
            .register(Box::new(INGEST_LATENCY.clone()))
            .expect("Failed to register INGEST_LATENCY");
        REGISTRY
            .register(Box::new(REJECTED_BATCHES.clone()))
            .expect("Failed to register REJECTED_BATCHES");
        REGISTRY
            .register(Box::new(WRITE_CONFLICTS.clone()))
            .expect("Failed to register WRITE_CONFLICTS");
    });
}

/// Gather all metrics and encode them in Prometheus text format
///
/// Returns an empty string if encoding fails (which should not happen with valid metrics).
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Metrics contained invalid UTF-8: {}", e);
        String::new()
    })
}

/// Current metric values in a human-readable form, for the CLI stats command.
pub struct MetricSnapshot {
    pub retrieval_requests_total: f64,
    pub retrieval_latency_avg: f64,
    pub retrieval_results_avg: f64,
    pub indexed_documents: f64,
    pub ingest_batches_total: f64,
    pub ingest_latency_avg: f64,
    pub rejected_batches_total: f64,
    pub write_conflicts_total: f64,
}

impl MetricSnapshot {
    /// Capture the current state of all metrics
    pub fn capture() -> Self {
        Self {
            retrieval_requests_total: RETRIEVAL_REQUESTS.get(),
            retrieval_latency_avg: calculate_histogram_avg(&RETRIEVAL_LATENCY),
            retrieval_results_avg: calculate_histogram_avg(&RETRIEVAL_RESULTS),
            indexed_documents: INDEXED_DOCUMENTS.get(),
            ingest_batches_total: INGEST_BATCHES.get(),
            ingest_latency_avg: calculate_histogram_avg(&INGEST_LATENCY),
            rejected_batches_total: REJECTED_BATCHES.get(),
            write_conflicts_total: WRITE_CONFLICTS.get(),
        }
    }
}

fn calculate_histogram_avg(histogram: &Histogram) -> f64 {
    let count = histogram.get_sample_count();
    if count == 0 {
        return 0.0;
    }
    histogram.get_sample_sum() / count as f64
}
