//! Subscription directory: recipient → push endpoint lookup and retirement.
//!
//! # Backend Architecture
//!
//! The directory is reached through the `SubscriptionDirectory` trait:
//!
//! - `MemorySubscriptionDirectory`: in-process storage using DashMap (default)
//! - `PostgresSubscriptionDirectory`: the `push_subscriptions` table
//!
//! The dispatcher never talks to a backend directly; it goes through
//! `DirectoryClient`, which absorbs backend errors so one recipient's failed
//! lookup cannot abort the rest of a batch.

mod backend;
mod client;
mod memory_backend;
mod postgres_backend;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::DirectoryConfig;
use crate::infrastructure::PostgresPool;

pub use backend::{DirectoryError, SubscriptionDirectory};
pub use client::DirectoryClient;
pub use memory_backend::MemorySubscriptionDirectory;
pub use postgres_backend::PostgresSubscriptionDirectory;

/// Opaque recipient identifier.
pub type RecipientId = String;

/// Key material the push service needs to encrypt a message for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointKeys {
    pub p256dh: String,
    pub auth: String,
}

/// One registered delivery target (a browser or device) of a recipient.
///
/// The address is the correlation key between a delivery outcome and its
/// directory record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Push service URL
    pub address: String,
    pub keys: EndpointKeys,
}

impl Endpoint {
    pub fn new(
        address: impl Into<String>,
        p256dh: impl Into<String>,
        auth: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            keys: EndpointKeys {
                p256dh: p256dh.into(),
                auth: auth.into(),
            },
        }
    }

    /// Name of the first missing piece of delivery material, if any.
    pub fn missing_material(&self) -> Option<&'static str> {
        if self.address.trim().is_empty() {
            Some("address")
        } else if self.keys.p256dh.trim().is_empty() {
            Some("p256dh key")
        } else if self.keys.auth.trim().is_empty() {
            Some("auth secret")
        } else {
            None
        }
    }
}

/// Create a subscription directory backend based on configuration.
///
/// - `"postgres"`: `PostgresSubscriptionDirectory` when a pool is provided
/// - `"memory"` (default): `MemorySubscriptionDirectory`
pub fn create_directory(
    config: &DirectoryConfig,
    pool: Option<PostgresPool>,
) -> Arc<dyn SubscriptionDirectory> {
    match config.backend.as_str() {
        "postgres" => {
            if let Some(pool) = pool {
                tracing::info!(backend = "postgres", "Creating PostgreSQL subscription directory");
                Arc::new(PostgresSubscriptionDirectory::new(pool))
            } else {
                tracing::warn!(
                    "PostgreSQL directory requested but no pool provided, falling back to memory"
                );
                Arc::new(MemorySubscriptionDirectory::new())
            }
        }
        _ => {
            tracing::info!(backend = "memory", "Creating memory subscription directory");
            Arc::new(MemorySubscriptionDirectory::new())
        }
    }
}
