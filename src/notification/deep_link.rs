//! Per-kind presentation table and deep-link resolution.
//!
//! Everything that varies by notification kind lives in `PROFILES`. Adding a
//! kind means adding a row here, nothing else branches on the kind.

use serde_json::{Map, Value};
use url::form_urlencoded;

use super::NotificationKind;

/// One query parameter of a deep link.
#[derive(Debug, Clone, Copy)]
pub enum LinkParam {
    /// `key=value`, always present
    Fixed(&'static str, &'static str),
    /// `key=data[field]`, omitted when the field is missing or empty
    Field(&'static str, &'static str),
}

/// Interactive button shown with the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub action: &'static str,
    pub title: &'static str,
}

#[derive(Debug)]
pub struct KindProfile {
    pub kind: NotificationKind,
    pub link: &'static [LinkParam],
    pub actions: &'static [ActionSpec],
    /// Keep the notification on screen until the user acts on it
    pub require_interaction: bool,
}

static PROFILES: [KindProfile; 4] = [
    KindProfile {
        kind: NotificationKind::JobPosted,
        link: &[LinkParam::Fixed("view", "job"), LinkParam::Field("id", "job_id")],
        actions: &[ActionSpec {
            action: "view",
            title: "Ver oferta",
        }],
        require_interaction: false,
    },
    KindProfile {
        kind: NotificationKind::NewMessage,
        link: &[
            LinkParam::Fixed("view", "chat"),
            LinkParam::Field("user", "sender_id"),
            LinkParam::Field("job", "job_id"),
        ],
        actions: &[ActionSpec {
            action: "open",
            title: "Abrir chat",
        }],
        require_interaction: false,
    },
    KindProfile {
        kind: NotificationKind::ApplicationAccepted,
        link: &[
            LinkParam::Fixed("view", "job"),
            LinkParam::Field("id", "job_id"),
            LinkParam::Fixed("tab", "application"),
        ],
        actions: &[ActionSpec {
            action: "view",
            title: "Ver detalles",
        }],
        require_interaction: true,
    },
    KindProfile {
        kind: NotificationKind::ApplicationRejected,
        link: &[LinkParam::Fixed("view", "jobs")],
        actions: &[],
        require_interaction: false,
    },
];

/// Table row for `kind`, `None` for kinds without one.
pub fn profile_for(kind: &NotificationKind) -> Option<&'static KindProfile> {
    PROFILES.iter().find(|p| &p.kind == kind)
}

/// Render a data field as a query value. Non-scalar and empty values count
/// as absent.
fn field_value(data: &Map<String, Value>, field: &str) -> Option<String> {
    match data.get(field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Maps a notification kind and its data to the URL the notification opens.
#[derive(Debug, Clone)]
pub struct DeepLinkResolver {
    base_url: String,
}

impl DeepLinkResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Total: kinds without a table row resolve to the base URL unchanged.
    pub fn resolve(&self, kind: &NotificationKind, data: &Map<String, Value>) -> String {
        let Some(profile) = profile_for(kind) else {
            return self.base_url.clone();
        };

        let mut query = form_urlencoded::Serializer::new(String::new());
        for param in profile.link {
            match *param {
                LinkParam::Fixed(key, value) => {
                    query.append_pair(key, value);
                }
                LinkParam::Field(key, field) => {
                    if let Some(value) = field_value(data, field) {
                        query.append_pair(key, &value);
                    }
                }
            }
        }

        format!(
            "{}/?{}",
            self.base_url.trim_end_matches('/'),
            query.finish()
        )
    }
}
