//! PostgreSQL-backed subscription directory.
//!
//! Table structure (`push_subscriptions`):
//! - `user_id` - recipient the subscription belongs to (compared as text)
//! - `endpoint` - push service URL, unique
//! - `p256dh`, `auth` - client key material
//! - `active` - false once the push service reported the endpoint gone

use async_trait::async_trait;

use crate::infrastructure::PostgresPool;

use super::backend::{DirectoryError, SubscriptionDirectory};
use super::Endpoint;

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    endpoint: String,
    p256dh: Option<String>,
    auth: Option<String>,
}

impl From<SubscriptionRow> for Endpoint {
    // Missing keys are kept empty so delivery rejects the endpoint explicitly.
    fn from(row: SubscriptionRow) -> Self {
        Endpoint::new(
            row.endpoint,
            row.p256dh.unwrap_or_default(),
            row.auth.unwrap_or_default(),
        )
    }
}

pub struct PostgresSubscriptionDirectory {
    pool: PostgresPool,
}

impl PostgresSubscriptionDirectory {
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionDirectory for PostgresSubscriptionDirectory {
    async fn list_active(&self, recipient: &str) -> Result<Vec<Endpoint>, DirectoryError> {
        let recipient = recipient.to_string();

        let rows: Vec<SubscriptionRow> = self
            .pool
            .execute_with_circuit_breaker(|pool| async move {
                sqlx::query_as(
                    r#"
                    SELECT endpoint, p256dh, auth
                    FROM push_subscriptions
                    WHERE user_id::text = $1 AND active = true
                    "#,
                )
                .bind(recipient)
                .fetch_all(&pool)
                .await
            })
            .await?;

        Ok(rows.into_iter().map(Endpoint::from).collect())
    }

    async fn set_inactive(&self, address: &str) -> Result<(), DirectoryError> {
        let address_owned = address.to_string();

        let result = self
            .pool
            .execute_with_circuit_breaker(|pool| async move {
                sqlx::query("UPDATE push_subscriptions SET active = false WHERE endpoint = $1 AND active = true")
                    .bind(address_owned)
                    .execute(&pool)
                    .await
            })
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(endpoint = %address, "Subscription already inactive or unknown");
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
