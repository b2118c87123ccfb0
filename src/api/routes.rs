use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::server::{api_key_auth, AppState};

use super::{health, prometheus_metrics, send_push, stats};

pub fn api_routes(state: AppState) -> Router<AppState> {
    let push = Router::new()
        .route("/api/send-push", post(send_push))
        .route("/api/v1/push/send", post(send_push))
        .route_layer(middleware::from_fn_with_state(state, api_key_auth));

    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .merge(push)
}
