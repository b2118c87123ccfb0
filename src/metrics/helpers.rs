//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    BATCHES_TOTAL, BATCH_RECIPIENTS, DELIVERIES_TOTAL, DELIVERY_LATENCY,
    DIRECTORY_LOOKUP_FAILURES_TOTAL, RETIREMENTS_TOTAL,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Records batch and delivery metrics
pub struct PushMetrics;

impl PushMetrics {
    pub fn record_batch_accepted(recipients: usize) {
        BATCHES_TOTAL.with_label_values(&["accepted"]).inc();
        BATCH_RECIPIENTS.observe(recipients as f64);
    }

    pub fn record_batch_rejected() {
        BATCHES_TOTAL.with_label_values(&["rejected"]).inc();
    }

    pub fn record_batch_failed() {
        BATCHES_TOTAL.with_label_values(&["failed"]).inc();
    }

    /// `outcome` is a `DeliveryOutcome` label: delivered, expired or failed
    pub fn record_outcome(outcome: &str) {
        DELIVERIES_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn record_latency(seconds: f64) {
        DELIVERY_LATENCY.observe(seconds);
    }
}

/// Records subscription directory metrics
pub struct DirectoryMetrics;

impl DirectoryMetrics {
    pub fn record_lookup_failure() {
        DIRECTORY_LOOKUP_FAILURES_TOTAL.inc();
    }

    pub fn record_retired() {
        RETIREMENTS_TOTAL.with_label_values(&["ok"]).inc();
    }

    pub fn record_retire_failed() {
        RETIREMENTS_TOTAL.with_label_values(&["failed"]).inc();
    }
}
