//! Push delivery transport.
//!
//! `PushTransport` is the single-endpoint send primitive; `DeliveryAdapter`
//! sits in front of it and turns every send into a `DeliveryOutcome`.

mod adapter;
mod gateway;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::directory::Endpoint;

pub use adapter::DeliveryAdapter;
pub use gateway::GatewayTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The push service no longer knows the endpoint (404 / 410)
    #[error("Subscription gone (status {status})")]
    Gone { status: u16 },

    #[error("Push service rejected message (status {status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Push request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    /// Endpoint record lacks material needed to send; nothing was sent
    #[error("Invalid endpoint: missing {0}")]
    InvalidEndpoint(&'static str),
}

impl TransportError {
    /// Classify a push service status code that is not a success.
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        match status {
            404 | 410 => TransportError::Gone { status },
            _ => TransportError::Rejected {
                status,
                detail: detail.into(),
            },
        }
    }

    pub fn is_gone(&self) -> bool {
        matches!(self, TransportError::Gone { .. })
    }
}

/// Sends one serialized message to one endpoint.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        endpoint: &Endpoint,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), TransportError>;

    fn name(&self) -> &'static str;
}
