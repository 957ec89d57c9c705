//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    ATTRIBUTES_REWRITTEN_TOTAL, BLOCKS_SKIPPED_TOTAL, PLACEHOLDERS_REGISTERED_TOTAL,
    STORE_ERRORS_TOTAL, STORE_OPERATIONS_TOTAL, STORE_PURGED_TOTAL, SUBSTITUTION_PASSES_TOTAL,
    TEXT_NODES_REWRITTEN_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording substitution engine metrics
pub struct EngineMetrics;

impl EngineMetrics {
    /// Record one completed pass and what it rewrote
    pub fn record_pass(text_nodes: usize, attributes: usize) {
        SUBSTITUTION_PASSES_TOTAL.inc();
        if text_nodes > 0 {
            TEXT_NODES_REWRITTEN_TOTAL.inc_by(text_nodes as u64);
        }
        if attributes > 0 {
            ATTRIBUTES_REWRITTEN_TOTAL.inc_by(attributes as u64);
        }
    }
}

/// Helper struct for recording registry metrics
pub struct RegistryMetrics;

impl RegistryMetrics {
    pub fn record_registered() {
        PLACEHOLDERS_REGISTERED_TOTAL.inc();
    }

    pub fn record_skipped() {
        BLOCKS_SKIPPED_TOTAL.inc();
    }
}

/// Helper struct for recording value store metrics
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record a store operation ("get", "set", "remove", "purge")
    pub fn record_operation(op: &str) {
        STORE_OPERATIONS_TOTAL.with_label_values(&[op]).inc();
    }

    /// Record a backend failure for the given operation
    pub fn record_error(op: &str) {
        STORE_ERRORS_TOTAL.with_label_values(&[op]).inc();
    }

    pub fn record_purged(count: usize) {
        if count > 0 {
            STORE_PURGED_TOTAL.inc_by(count as u64);
        }
    }
}
