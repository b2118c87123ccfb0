use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::directory::Endpoint;
use crate::metrics::PushMetrics;
use crate::notification::DeliveryOutcome;

use super::{PushTransport, TransportError};

/// Delivers one message to one endpoint and classifies the result.
///
/// Expected failures never escape as errors: every call returns exactly one
/// `DeliveryOutcome`.
#[derive(Clone)]
pub struct DeliveryAdapter {
    transport: Arc<dyn PushTransport>,
    ttl: Duration,
}

impl DeliveryAdapter {
    pub fn new(transport: Arc<dyn PushTransport>, ttl: Duration) -> Self {
        Self { transport, ttl }
    }

    pub async fn deliver(&self, endpoint: &Endpoint, payload: &str) -> DeliveryOutcome {
        let outcome = self.attempt(endpoint, payload).await;
        PushMetrics::record_outcome(outcome.label());
        outcome
    }

    async fn attempt(&self, endpoint: &Endpoint, payload: &str) -> DeliveryOutcome {
        if let Some(missing) = endpoint.missing_material() {
            tracing::warn!(
                endpoint = %endpoint.address,
                missing = missing,
                "Skipping subscription with incomplete key material"
            );
            return DeliveryOutcome::Failed {
                endpoint: endpoint.clone(),
                detail: TransportError::InvalidEndpoint(missing).to_string(),
            };
        }

        let started = Instant::now();
        let result = self.transport.send(endpoint, payload, self.ttl).await;
        PushMetrics::record_latency(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) if e.is_gone() => {
                tracing::warn!(endpoint = %endpoint.address, "Expired subscription");
                DeliveryOutcome::Expired(endpoint.clone())
            }
            Err(e) => {
                tracing::error!(
                    endpoint = %endpoint.address,
                    transport = self.transport.name(),
                    error = %e,
                    "Push send error"
                );
                DeliveryOutcome::Failed {
                    endpoint: endpoint.clone(),
                    detail: e.to_string(),
                }
            }
        }
    }
}
