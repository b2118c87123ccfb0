use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::config::PushConfig;
use crate::directory::{DirectoryClient, RecipientId, SubscriptionDirectory};
use crate::metrics::PushMetrics;
use crate::transport::{DeliveryAdapter, PushTransport};

use super::{BatchSummary, DeliveryOutcome, NotificationIntent, PayloadBuilder};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Missing or empty batch fields; nothing was sent
    #[error("{0}")]
    InvalidRequest(String),

    /// Fault outside the expected delivery failures
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Cumulative dispatcher statistics
#[derive(Debug, Default)]
pub struct DispatcherStats {
    pub batches: AtomicU64,
    pub rejected_batches: AtomicU64,
    pub recipients: AtomicU64,
    pub sent: AtomicU64,
    pub expired: AtomicU64,
    pub errors: AtomicU64,
    pub retirements_failed: AtomicU64,
}

impl DispatcherStats {
    fn record_batch(&self, recipients: usize, summary: &BatchSummary) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.recipients.fetch_add(recipients as u64, Ordering::Relaxed);
        self.sent.fetch_add(summary.sent, Ordering::Relaxed);
        self.expired.fetch_add(summary.expired, Ordering::Relaxed);
        self.errors.fetch_add(summary.errors, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            rejected_batches: self.rejected_batches.load(Ordering::Relaxed),
            recipients: self.recipients.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            retirements_failed: self.retirements_failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStatsSnapshot {
    pub batches: u64,
    pub rejected_batches: u64,
    pub recipients: u64,
    pub sent: u64,
    pub expired: u64,
    pub errors: u64,
    pub retirements_failed: u64,
}

/// Per-recipient result: how many endpoints were fetched and what happened.
struct RecipientReport {
    fetched: u64,
    summary: BatchSummary,
}

/// Fans one notification out to every active endpoint of every recipient.
pub struct PushDispatcher {
    directory: DirectoryClient,
    delivery: DeliveryAdapter,
    payloads: PayloadBuilder,
    max_concurrent_recipients: usize,
    stats: DispatcherStats,
}

impl PushDispatcher {
    pub fn new(
        config: &PushConfig,
        directory: Arc<dyn SubscriptionDirectory>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        Self {
            directory: DirectoryClient::new(directory),
            delivery: DeliveryAdapter::new(transport, config.ttl()),
            payloads: PayloadBuilder::from_config(config),
            max_concurrent_recipients: config.max_concurrent_recipients.max(1),
            stats: DispatcherStats::default(),
        }
    }

    pub fn stats(&self) -> DispatcherStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn directory_backend(&self) -> &'static str {
        self.directory.backend_name()
    }

    /// Deliver `intent` to every recipient and summarize the outcomes.
    ///
    /// Only a malformed request or an internal fault is an error; endpoint
    /// and recipient failures are reflected in the returned counts.
    #[tracing::instrument(
        name = "dispatcher.dispatch",
        skip(self, intent, recipients),
        fields(notification_type = %intent.kind(), recipient_count = recipients.len())
    )]
    pub async fn dispatch(
        &self,
        intent: &NotificationIntent,
        recipients: &[RecipientId],
    ) -> Result<BatchSummary, DispatchError> {
        if let Err(e) = validate(intent, recipients) {
            self.stats.rejected_batches.fetch_add(1, Ordering::Relaxed);
            PushMetrics::record_batch_rejected();
            return Err(e);
        }

        let payload = self.payloads.build(intent);
        let serialized = payload.to_shared_json().map_err(|e| {
            PushMetrics::record_batch_failed();
            DispatchError::Internal(format!("failed to serialize payload: {}", e))
        })?;

        let batch_id = Uuid::new_v4();
        tracing::info!(
            batch_id = %batch_id,
            notification_type = %intent.kind(),
            recipients = recipients.len(),
            "Sending notification batch"
        );

        let per_recipient: Vec<_> = recipients
            .iter()
            .map(|recipient| self.dispatch_recipient(recipient, &serialized))
            .collect();
        let reports: Vec<RecipientReport> = stream::iter(per_recipient)
            .buffer_unordered(self.max_concurrent_recipients)
            .collect()
            .await;

        let fetched: u64 = reports.iter().map(|r| r.fetched).sum();
        let summary: BatchSummary = reports.iter().map(|r| r.summary).sum();

        if summary.total() != fetched {
            PushMetrics::record_batch_failed();
            tracing::error!(
                batch_id = %batch_id,
                fetched = fetched,
                counted = summary.total(),
                "Delivery outcome count does not match fetched endpoints"
            );
            return Err(DispatchError::Internal(
                "delivery outcome count mismatch".to_string(),
            ));
        }

        self.stats.record_batch(recipients.len(), &summary);
        PushMetrics::record_batch_accepted(recipients.len());

        tracing::info!(
            batch_id = %batch_id,
            sent = summary.sent,
            expired = summary.expired,
            errors = summary.errors,
            "Notification batch complete"
        );

        Ok(summary)
    }

    /// All endpoints of one recipient are sent together and awaited together.
    #[tracing::instrument(name = "dispatcher.recipient", skip(self, payload))]
    async fn dispatch_recipient(&self, recipient_id: &str, payload: &Arc<str>) -> RecipientReport {
        let endpoints = self.directory.list_active_endpoints(recipient_id).await;

        if endpoints.is_empty() {
            tracing::info!(recipient_id = %recipient_id, "No active subscriptions for recipient");
            return RecipientReport {
                fetched: 0,
                summary: BatchSummary::default(),
            };
        }

        tracing::info!(
            recipient_id = %recipient_id,
            endpoint_count = endpoints.len(),
            "Sending to recipient subscriptions"
        );

        let outcomes = join_all(
            endpoints
                .iter()
                .map(|endpoint| self.delivery.deliver(endpoint, payload)),
        )
        .await;

        // One retirement per expired outcome; its result never changes the counts.
        let retirements = outcomes.iter().filter_map(|outcome| match outcome {
            DeliveryOutcome::Expired(endpoint) => Some(self.directory.retire(&endpoint.address)),
            _ => None,
        });
        let failed_retirements = join_all(retirements)
            .await
            .into_iter()
            .filter(|retired| !retired)
            .count();
        if failed_retirements > 0 {
            self.stats
                .retirements_failed
                .fetch_add(failed_retirements as u64, Ordering::Relaxed);
        }

        RecipientReport {
            fetched: endpoints.len() as u64,
            summary: BatchSummary::fold(&outcomes),
        }
    }
}

fn validate(intent: &NotificationIntent, recipients: &[RecipientId]) -> Result<(), DispatchError> {
    let mut missing = intent.missing_fields();
    if recipients.is_empty() {
        missing.push("user_ids");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DispatchError::InvalidRequest(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}
