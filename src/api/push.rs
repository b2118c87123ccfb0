//! Batch push submission.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::notification::NotificationIntent;
use crate::server::AppState;

/// Body of `POST /api/send-push`.
///
/// Every field is optional at the parsing stage so a missing field is
/// reported as a 400 with the field names, the same as an empty one.
#[derive(Debug, Default, Deserialize)]
pub struct SendPushRequest {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub user_ids: Option<Vec<RecipientId>>,
    pub title: Option<String>,
    pub body: Option<String>,
    /// Type-dependent fields such as `job_id` or `sender_id`
    pub data: Option<Map<String, Value>>,
}

/// A user id as sent by the caller, either `"17"` or `17`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RecipientId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RecipientId> for String {
    fn from(id: RecipientId) -> Self {
        match id {
            RecipientId::Text(text) => text,
            RecipientId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendPushResponse {
    pub success: bool,
    pub sent: u64,
    pub expired: u64,
    pub errors: u64,
}

/// Send one notification to every active endpoint of the listed users.
pub async fn send_push(
    State(state): State<AppState>,
    request: std::result::Result<Json<SendPushRequest>, JsonRejection>,
) -> Result<Json<SendPushResponse>> {
    let Json(request) = request.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    let intent = NotificationIntent::new(
        request.kind.unwrap_or_default(),
        request.title.unwrap_or_default(),
        request.body.unwrap_or_default(),
    )
    .with_data(request.data.unwrap_or_default());
    let recipients: Vec<String> = request
        .user_ids
        .unwrap_or_default()
        .into_iter()
        .map(String::from)
        .collect();

    let summary = state.dispatcher.dispatch(&intent, &recipients).await?;

    Ok(Json(SendPushResponse {
        success: true,
        sent: summary.sent,
        expired: summary.expired,
        errors: summary.errors,
    }))
}
