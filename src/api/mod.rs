//! API layer - HTTP endpoint handlers.

mod health;
mod metrics;
mod push;
mod routes;

pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use push::{send_push, RecipientId, SendPushRequest, SendPushResponse};
pub use routes::api_routes;
