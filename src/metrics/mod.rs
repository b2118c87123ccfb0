//! Prometheus metrics for the push fan-out service.
//!
//! - Batch metrics (accepted / rejected / failed batches, recipients per batch)
//! - Delivery metrics (outcomes by class, transport latency)
//! - Directory metrics (lookup failures, retirements, circuit breaker state)

mod helpers;

pub use helpers::{encode_metrics, DirectoryMetrics, PushMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "push";

lazy_static! {
    // ============================================================================
    // Batch Metrics
    // ============================================================================

    /// Batches by result (accepted, rejected, failed)
    pub static ref BATCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_batches_total", METRIC_PREFIX),
        "Total push batches received",
        &["result"]
    ).unwrap();

    /// Recipients per accepted batch
    pub static ref BATCH_RECIPIENTS: Histogram = register_histogram!(
        format!("{}_batch_recipients", METRIC_PREFIX),
        "Distribution of recipients per batch",
        vec![1.0, 2.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0]
    ).unwrap();

    // ============================================================================
    // Delivery Metrics
    // ============================================================================

    /// Endpoint deliveries by outcome (delivered, expired, failed)
    pub static ref DELIVERIES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_deliveries_total", METRIC_PREFIX),
        "Total endpoint delivery attempts by outcome",
        &["outcome"]
    ).unwrap();

    /// Latency of one transport call
    pub static ref DELIVERY_LATENCY: Histogram = register_histogram!(
        format!("{}_delivery_latency_seconds", METRIC_PREFIX),
        "Push transport call latency in seconds",
        vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    // ============================================================================
    // Directory Metrics
    // ============================================================================

    /// Recipient lookups that failed and were treated as "no endpoints"
    pub static ref DIRECTORY_LOOKUP_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_directory_lookup_failures_total", METRIC_PREFIX),
        "Total subscription lookups that failed soft"
    ).unwrap();

    /// Endpoint retirements by result (ok, failed)
    pub static ref RETIREMENTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_retirements_total", METRIC_PREFIX),
        "Total expired endpoint retirements",
        &["result"]
    ).unwrap();

    /// Directory circuit breaker state (0=closed, 1=open, 2=half-open)
    pub static ref DIRECTORY_CIRCUIT_BREAKER_STATE: IntGauge = register_int_gauge!(
        format!("{}_directory_circuit_breaker_state", METRIC_PREFIX),
        "Directory circuit breaker state (0=closed, 1=open, 2=half-open)"
    ).unwrap();
}
