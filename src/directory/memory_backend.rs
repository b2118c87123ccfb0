//! In-memory subscription directory using DashMap.
//!
//! Records live only for the lifetime of the process; intended for local
//! development and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use super::backend::{DirectoryError, SubscriptionDirectory};
use super::Endpoint;

#[derive(Debug, Clone)]
struct StoredSubscription {
    endpoint: Endpoint,
    active: bool,
}

/// In-memory subscription directory.
///
/// Per-recipient record lists keyed by recipient id. Addresses are unique
/// within a recipient: registering a known address replaces its keys and
/// reactivates it.
#[derive(Default)]
pub struct MemorySubscriptionDirectory {
    subscriptions: DashMap<String, Vec<StoredSubscription>>,
}

impl MemorySubscriptionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-activate) an endpoint for a recipient.
    pub fn register(&self, recipient: &str, endpoint: Endpoint) {
        let mut records = self.subscriptions.entry(recipient.to_string()).or_default();

        match records
            .iter_mut()
            .find(|r| r.endpoint.address == endpoint.address)
        {
            Some(existing) => {
                existing.endpoint = endpoint;
                existing.active = true;
            }
            None => records.push(StoredSubscription {
                endpoint,
                active: true,
            }),
        }

        tracing::debug!(
            recipient_id = %recipient,
            subscriptions = records.len(),
            "Subscription registered"
        );
    }

    /// Whether the endpoint with `address` is registered and active.
    pub fn is_active(&self, address: &str) -> bool {
        self.subscriptions.iter().any(|entry| {
            entry
                .value()
                .iter()
                .any(|r| r.active && r.endpoint.address == address)
        })
    }
}

#[async_trait]
impl SubscriptionDirectory for MemorySubscriptionDirectory {
    async fn list_active(&self, recipient: &str) -> Result<Vec<Endpoint>, DirectoryError> {
        Ok(self
            .subscriptions
            .get(recipient)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.active)
                    .map(|r| r.endpoint.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_inactive(&self, address: &str) -> Result<(), DirectoryError> {
        for mut entry in self.subscriptions.iter_mut() {
            for record in entry.value_mut().iter_mut() {
                if record.endpoint.address == address {
                    record.active = false;
                }
            }
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
