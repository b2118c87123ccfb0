use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of notification being pushed.
///
/// Known kinds have a row in the profile table (deep link, actions); any
/// other string is carried through as `Other` and gets the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationKind {
    JobPosted,
    NewMessage,
    ApplicationAccepted,
    ApplicationRejected,
    Other(String),
}

impl NotificationKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "job_posted" => NotificationKind::JobPosted,
            "new_message" => NotificationKind::NewMessage,
            "application_accepted" => NotificationKind::ApplicationAccepted,
            "application_rejected" => NotificationKind::ApplicationRejected,
            other => NotificationKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NotificationKind::JobPosted => "job_posted",
            NotificationKind::NewMessage => "new_message",
            NotificationKind::ApplicationAccepted => "application_accepted",
            NotificationKind::ApplicationRejected => "application_rejected",
            NotificationKind::Other(raw) => raw,
        }
    }
}

impl From<String> for NotificationKind {
    fn from(raw: String) -> Self {
        NotificationKind::parse(&raw)
    }
}

impl From<NotificationKind> for String {
    fn from(kind: NotificationKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to notify about: kind, display text and auxiliary data.
///
/// Immutable once built; the dispatcher only reads it.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationIntent {
    kind: NotificationKind,
    title: String,
    body: String,
    data: Map<String, Value>,
}

impl NotificationIntent {
    pub fn new(
        kind: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            kind: NotificationKind::from(kind.into()),
            title: title.into(),
            body: body.into(),
            data: Map::new(),
        }
    }

    /// Attach auxiliary fields (`job_id`, `sender_id`, ...).
    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn kind(&self) -> &NotificationKind {
        &self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Names of required fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.kind.as_str().trim().is_empty() {
            missing.push("type");
        }
        if self.title.trim().is_empty() {
            missing.push("title");
        }
        if self.body.trim().is_empty() {
            missing.push("body");
        }
        missing
    }
}
