use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::PushConfig;

use super::deep_link::{profile_for, DeepLinkResolver};
use super::NotificationIntent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// What the service worker receives: display fields, deep link and actions.
///
/// Built once per batch and shared read-only by every delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Notification kind; lets the browser collapse notifications of one kind
    pub tag: String,
    /// Caller data plus `url` (deep link) and `type`
    pub data: Map<String, Value>,
    pub require_interaction: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<NotificationAction>,
}

impl NotificationPayload {
    pub fn url(&self) -> Option<&str> {
        self.data.get("url").and_then(Value::as_str)
    }

    /// Serialize once; the result is cloned cheaply into every delivery.
    pub fn to_shared_json(&self) -> Result<Arc<str>, serde_json::Error> {
        serde_json::to_string(self).map(Arc::from)
    }
}

/// Builds `NotificationPayload`s with the configured icons and link base.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    resolver: DeepLinkResolver,
    icon: String,
    badge: String,
}

impl PayloadBuilder {
    pub fn new(resolver: DeepLinkResolver, icon: impl Into<String>, badge: impl Into<String>) -> Self {
        Self {
            resolver,
            icon: icon.into(),
            badge: badge.into(),
        }
    }

    pub fn from_config(config: &PushConfig) -> Self {
        Self::new(
            DeepLinkResolver::new(config.app_url.clone()),
            config.icon.clone(),
            config.badge.clone(),
        )
    }

    pub fn build(&self, intent: &NotificationIntent) -> NotificationPayload {
        let kind = intent.kind();
        let profile = profile_for(kind);

        // `url` and `type` win over caller-supplied keys of the same name.
        let mut data = intent.data().clone();
        data.insert(
            "url".to_string(),
            Value::String(self.resolver.resolve(kind, intent.data())),
        );
        data.insert("type".to_string(), Value::String(kind.as_str().to_string()));

        NotificationPayload {
            title: intent.title().to_string(),
            body: intent.body().to_string(),
            icon: self.icon.clone(),
            badge: self.badge.clone(),
            tag: kind.as_str().to_string(),
            data,
            require_interaction: profile.is_some_and(|p| p.require_interaction),
            actions: profile
                .map(|p| {
                    p.actions
                        .iter()
                        .map(|a| NotificationAction {
                            action: a.action.to_string(),
                            title: a.title.to_string(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
