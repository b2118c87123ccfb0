//! HTTP push gateway transport.
//!
//! The gateway holds the VAPID credentials and performs payload encryption;
//! this side hands it the subscription, the serialized payload and the TTL.
//!
//! Request: `POST {gateway_url}` with
//! `{"subscription": {"endpoint", "keys": {"p256dh", "auth"}}, "payload", "ttl"}`.
//!
//! Reply: any 2xx with an optional `{"statusCode", "body"}` body relaying the
//! push service's answer (`statusCode` as a number or numeric string). A
//! non-2xx reply is a gateway failure, never an expired subscription.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::PushConfig;
use crate::directory::{Endpoint, EndpointKeys};

use super::{PushTransport, TransportError};

/// Longest error body carried into a failure detail
const MAX_DETAIL_LEN: usize = 256;

#[derive(Serialize)]
struct GatewayRequest<'a> {
    subscription: GatewaySubscription<'a>,
    payload: &'a str,
    ttl: u64,
}

#[derive(Serialize)]
struct GatewaySubscription<'a> {
    endpoint: &'a str,
    keys: &'a EndpointKeys,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayReply {
    status_code: Option<RelayedStatus>,
    body: Option<String>,
}

/// Push service status as relayed by the gateway; some gateways send it
/// as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelayedStatus {
    Code(u16),
    Text(String),
}

impl RelayedStatus {
    fn code(&self) -> Option<u16> {
        match self {
            RelayedStatus::Code(code) => Some(*code),
            RelayedStatus::Text(text) => text.trim().parse().ok(),
        }
    }
}

pub struct GatewayTransport {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl GatewayTransport {
    pub fn new(config: &PushConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            url: config.gateway_url.clone(),
            token: config.gateway_token.clone(),
        })
    }
}

fn truncate(mut detail: String) -> String {
    if detail.len() > MAX_DETAIL_LEN {
        let mut cut = MAX_DETAIL_LEN;
        while !detail.is_char_boundary(cut) {
            cut -= 1;
        }
        detail.truncate(cut);
    }
    detail
}

fn classify_request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}

#[async_trait]
impl PushTransport for GatewayTransport {
    async fn send(
        &self,
        endpoint: &Endpoint,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), TransportError> {
        let body = GatewayRequest {
            subscription: GatewaySubscription {
                endpoint: &endpoint.address,
                keys: &endpoint.keys,
            },
            payload,
            ttl: ttl.as_secs(),
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(classify_request_error)?;
        let status = response.status();

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                detail: format!("gateway error: {}", truncate(detail)),
            });
        }

        // An empty 2xx body means the gateway accepted the message.
        let text = response.text().await.map_err(classify_request_error)?;
        if text.trim().is_empty() {
            return Ok(());
        }

        let reply: GatewayReply = match serde_json::from_str(&text) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(
                    endpoint = %endpoint.address,
                    error = %e,
                    body = %truncate(text),
                    "Unreadable gateway reply, counting as delivered"
                );
                return Ok(());
            }
        };

        let code = match reply.status_code {
            None => return Ok(()),
            Some(status) => match status.code() {
                Some(code) => code,
                None => {
                    tracing::warn!(
                        endpoint = %endpoint.address,
                        status = ?status,
                        "Non-numeric relayed status, counting as delivered"
                    );
                    return Ok(());
                }
            },
        };

        if (200..300).contains(&code) {
            Ok(())
        } else {
            Err(TransportError::from_status(
                code,
                truncate(reply.body.unwrap_or_default()),
            ))
        }
    }

    fn name(&self) -> &'static str {
        "gateway"
    }
}
