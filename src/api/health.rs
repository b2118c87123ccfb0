//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::infrastructure::{CircuitBreakerStats, CircuitState};
use crate::notification::DispatcherStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub directory: DirectoryHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct DirectoryHealthResponse {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circuit: Option<CircuitState>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub notifications: DispatcherStatsSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_circuit: Option<CircuitBreakerStats>,
}

/// GET /health
///
/// Reports "degraded" while the directory circuit breaker is open: batches
/// are still accepted but every recipient resolves to no endpoints.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let circuit = state.directory_breaker.as_ref().map(|b| b.state());
    let status = match circuit {
        Some(CircuitState::Open) => "degraded",
        _ => "healthy",
    };

    let now = Utc::now();
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Push backend is working".to_string(),
        timestamp: now,
        uptime_seconds: (now - state.started_at).num_seconds().max(0) as u64,
        directory: DirectoryHealthResponse {
            backend: state.dispatcher.directory_backend().to_string(),
            circuit,
        },
    })
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        notifications: state.dispatcher.stats(),
        directory_circuit: state.directory_breaker.as_ref().map(|b| b.stats()),
    })
}
