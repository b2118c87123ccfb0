//! Backend trait for subscription storage.

use async_trait::async_trait;
use thiserror::Error;

use crate::infrastructure::PostgresPoolError;

use super::Endpoint;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backing store is temporarily unreachable (e.g., circuit breaker open)
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

impl From<PostgresPoolError> for DirectoryError {
    fn from(err: PostgresPoolError) -> Self {
        match err {
            PostgresPoolError::Sqlx(e) => DirectoryError::Database(e),
            PostgresPoolError::CircuitOpen => {
                DirectoryError::Unavailable("circuit breaker open".to_string())
            }
        }
    }
}

/// Durable mapping of recipient → endpoint records.
///
/// Endpoint records are owned by the store: callers only read them and flip
/// them inactive.
#[async_trait]
pub trait SubscriptionDirectory: Send + Sync {
    /// Active endpoints registered for `recipient`.
    async fn list_active(&self, recipient: &str) -> Result<Vec<Endpoint>, DirectoryError>;

    /// Mark the endpoint with `address` inactive. Retiring an endpoint that is
    /// already inactive, or unknown, succeeds.
    async fn set_inactive(&self, address: &str) -> Result<(), DirectoryError>;

    fn backend_name(&self) -> &'static str;
}
