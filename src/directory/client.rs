use std::sync::Arc;

use crate::metrics::DirectoryMetrics;

use super::{Endpoint, SubscriptionDirectory};

/// Fail-soft front for a `SubscriptionDirectory`.
///
/// Lookup failures become "no endpoints", retirement failures become `false`;
/// both are logged and neither is returned as an error.
#[derive(Clone)]
pub struct DirectoryClient {
    backend: Arc<dyn SubscriptionDirectory>,
}

impl DirectoryClient {
    pub fn new(backend: Arc<dyn SubscriptionDirectory>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    pub async fn list_active_endpoints(&self, recipient: &str) -> Vec<Endpoint> {
        match self.backend.list_active(recipient).await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                DirectoryMetrics::record_lookup_failure();
                tracing::warn!(
                    recipient_id = %recipient,
                    backend = self.backend.backend_name(),
                    error = %e,
                    "Failed to fetch subscriptions, skipping recipient"
                );
                Vec::new()
            }
        }
    }

    /// Best-effort retirement of an expired endpoint.
    pub async fn retire(&self, address: &str) -> bool {
        match self.backend.set_inactive(address).await {
            Ok(()) => {
                DirectoryMetrics::record_retired();
                tracing::debug!(endpoint = %address, "Subscription marked inactive");
                true
            }
            Err(e) => {
                DirectoryMetrics::record_retire_failed();
                tracing::warn!(
                    endpoint = %address,
                    error = %e,
                    "Failed to mark subscription inactive"
                );
                false
            }
        }
    }
}
