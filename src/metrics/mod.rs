//! Prometheus metrics for placeholder substitution.
//!
//! This module provides:
//! - Engine metrics (passes run, text nodes and attributes rewritten)
//! - Registry metrics (placeholders registered, malformed blocks skipped)
//! - Value store metrics (operations, failures, purged entries)

mod helpers;

pub use helpers::{encode_metrics, EngineMetrics, RegistryMetrics, StoreMetrics};

use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "placeholder";

lazy_static! {
    // ============================================================================
    // Engine Metrics
    // ============================================================================

    /// Total substitution passes over a rendered post
    pub static ref SUBSTITUTION_PASSES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_substitution_passes_total", METRIC_PREFIX),
        "Total substitution passes over rendered posts"
    ).unwrap();

    /// Text nodes whose content changed during a pass
    pub static ref TEXT_NODES_REWRITTEN_TOTAL: IntCounter = register_int_counter!(
        format!("{}_text_nodes_rewritten_total", METRIC_PREFIX),
        "Total text nodes rewritten by substitution"
    ).unwrap();

    /// Link attributes whose value changed during a pass
    pub static ref ATTRIBUTES_REWRITTEN_TOTAL: IntCounter = register_int_counter!(
        format!("{}_attributes_rewritten_total", METRIC_PREFIX),
        "Total link attributes rewritten by substitution"
    ).unwrap();

    // ============================================================================
    // Registry Metrics
    // ============================================================================

    /// Placeholder blocks turned into definitions
    pub static ref PLACEHOLDERS_REGISTERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_placeholders_registered_total", METRIC_PREFIX),
        "Total placeholder blocks registered"
    ).unwrap();

    /// Placeholder blocks skipped because they carry no key
    pub static ref BLOCKS_SKIPPED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_blocks_skipped_total", METRIC_PREFIX),
        "Total placeholder blocks skipped as malformed"
    ).unwrap();

    // ============================================================================
    // Store Metrics
    // ============================================================================

    /// Value store operations by kind
    pub static ref STORE_OPERATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_store_operations_total", METRIC_PREFIX),
        "Total value store operations",
        &["op"]
    ).unwrap();

    /// Value store backend failures by kind
    pub static ref STORE_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_store_errors_total", METRIC_PREFIX),
        "Total value store backend failures",
        &["op"]
    ).unwrap();

    /// Entries removed by the expiry purge
    pub static ref STORE_PURGED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_store_purged_total", METRIC_PREFIX),
        "Total expired entries purged from the value store"
    ).unwrap();
}
