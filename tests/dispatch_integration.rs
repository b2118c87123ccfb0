//! Fan-out dispatcher integration tests
//!
//! These tests drive `PushDispatcher` end to end against the in-memory
//! directory and a scripted transport, without a push gateway or database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_test::{assert_err, assert_ok};

use push_fanout_service::config::PushConfig;
use push_fanout_service::directory::{
    DirectoryError, Endpoint, MemorySubscriptionDirectory, SubscriptionDirectory,
};
use push_fanout_service::notification::{
    BatchSummary, DispatchError, NotificationIntent, PushDispatcher,
};
use push_fanout_service::transport::{PushTransport, TransportError};

// =============================================================================
// Test doubles
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Reply {
    Ok,
    Gone,
    Rejected(u16),
    Network,
}

/// Transport answering per endpoint address; unknown addresses succeed.
#[derive(Default)]
struct ScriptedTransport {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<(String, String, Duration)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTransport {
    fn with(mut self, address: &str, reply: Reply) -> Self {
        self.replies.insert(address.to_string(), reply);
        self
    }

    fn calls(&self) -> Vec<(String, String, Duration)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushTransport for ScriptedTransport {
    async fn send(
        &self,
        endpoint: &Endpoint,
        payload: &str,
        ttl: Duration,
    ) -> Result<(), TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.address.clone(), payload.to_string(), ttl));

        tokio::time::sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.replies.get(&endpoint.address).copied().unwrap_or(Reply::Ok) {
            Reply::Ok => Ok(()),
            Reply::Gone => Err(TransportError::from_status(410, "gone")),
            Reply::Rejected(status) => Err(TransportError::from_status(status, "rejected")),
            Reply::Network => Err(TransportError::Network("connection reset".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Memory directory that records every call and can fail chosen lookups.
#[derive(Default)]
struct RecordingDirectory {
    inner: MemorySubscriptionDirectory,
    failing_recipients: Vec<String>,
    fail_retirements: bool,
    lookups: Mutex<Vec<String>>,
    retired: Mutex<Vec<String>>,
}

impl RecordingDirectory {
    fn register(&self, recipient: &str, address: &str) {
        self.inner
            .register(recipient, Endpoint::new(address, "p256dh-key", "auth-secret"));
    }

    fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    fn retired(&self) -> Vec<String> {
        self.retired.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriptionDirectory for RecordingDirectory {
    async fn list_active(&self, recipient: &str) -> Result<Vec<Endpoint>, DirectoryError> {
        self.lookups.lock().unwrap().push(recipient.to_string());
        if self.failing_recipients.iter().any(|r| r == recipient) {
            return Err(DirectoryError::Unavailable("lookup failed".to_string()));
        }
        self.inner.list_active(recipient).await
    }

    async fn set_inactive(&self, address: &str) -> Result<(), DirectoryError> {
        self.retired.lock().unwrap().push(address.to_string());
        if self.fail_retirements {
            return Err(DirectoryError::Unavailable("write failed".to_string()));
        }
        self.inner.set_inactive(address).await
    }

    fn backend_name(&self) -> &'static str {
        "recording"
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn push_config() -> PushConfig {
    PushConfig {
        app_url: "https://app.example.com".to_string(),
        max_concurrent_recipients: 4,
        ..PushConfig::default()
    }
}

fn dispatcher(
    directory: Arc<RecordingDirectory>,
    transport: Arc<ScriptedTransport>,
) -> PushDispatcher {
    PushDispatcher::new(&push_config(), directory, transport)
}

fn job_posted(job_id: &str) -> NotificationIntent {
    NotificationIntent::new("job_posted", "New job", "A new shift is available")
        .with_data(json!({ "job_id": job_id }).as_object().cloned().unwrap())
}

fn users(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Batch outcome tests
// =============================================================================

mod outcome_tests {
    use super::*;

    #[tokio::test]
    async fn test_one_delivered_one_expired_one_empty_recipient() {
        let directory = Arc::new(RecordingDirectory::default());
        directory.register("alice", "https://push.example/alice-laptop");
        directory.register("alice", "https://push.example/alice-phone");
        let transport = Arc::new(
            ScriptedTransport::default().with("https://push.example/alice-phone", Reply::Gone),
        );

        let summary = assert_ok!(
            dispatcher(directory.clone(), transport)
                .dispatch(&job_posted("42"), &users(&["alice", "bob"]))
                .await
        );

        assert_eq!(
            summary,
            BatchSummary {
                sent: 1,
                expired: 1,
                errors: 0
            }
        );
        assert_eq!(directory.retired(), vec!["https://push.example/alice-phone"]);
        assert!(!directory.inner.is_active("https://push.example/alice-phone"));
        assert!(directory.inner.is_active("https://push.example/alice-laptop"));
    }

    #[tokio::test]
    async fn test_unclassified_transport_error_is_counted() {
        let directory = Arc::new(RecordingDirectory::default());
        directory.register("alice", "https://push.example/a");
        directory.register("alice", "https://push.example/b");
        directory.register("carol", "https://push.example/c");
        let transport = Arc::new(
            ScriptedTransport::default()
                .with("https://push.example/a", Reply::Network)
                .with("https://push.example/c", Reply::Rejected(500)),
        );

        let summary = dispatcher(directory.clone(), transport)
            .dispatch(&job_posted("1"), &users(&["alice", "carol"]))
            .await
            .unwrap();

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.expired, 0);
        assert!(directory.retired().is_empty());
    }

    #[tokio::test]
    async fn test_every_fetched_endpoint_is_counted_once() {
        let directory = Arc::new(RecordingDirectory::default());
        let mut transport = ScriptedTransport::default();
        let mut expected_endpoints = 0;
        for user in 0..10 {
            for device in 0..(user % 4) {
                let address = format!("https://push.example/u{}-d{}", user, device);
                directory.register(&format!("user-{}", user), &address);
                let reply = match device {
                    0 => Reply::Ok,
                    1 => Reply::Gone,
                    _ => Reply::Rejected(429),
                };
                transport = transport.with(&address, reply);
                expected_endpoints += 1;
            }
        }
        let transport = Arc::new(transport);
        let recipients: Vec<String> = (0..10).map(|u| format!("user-{}", u)).collect();

        let summary = dispatcher(directory.clone(), transport.clone())
            .dispatch(&job_posted("7"), &recipients)
            .await
            .unwrap();

        assert_eq!(summary.total(), expected_endpoints);
        assert_eq!(transport.calls().len() as u64, expected_endpoints);
        assert_eq!(directory.retired().len() as u64, summary.expired);
    }

    #[tokio::test]
    async fn test_each_expired_endpoint_is_retired_exactly_once() {
        let directory = Arc::new(RecordingDirectory::default());
        directory.register("alice", "https://push.example/ok");
        directory.register("alice", "https://push.example/gone-1");
        directory.register("alice", "https://push.example/fail");
        directory.register("alice", "https://push.example/gone-2");
        let transport = Arc::new(
            ScriptedTransport::default()
                .with("https://push.example/gone-1", Reply::Gone)
                .with("https://push.example/gone-2", Reply::Rejected(404))
                .with("https://push.example/fail", Reply::Rejected(400)),
        );

        let summary = dispatcher(directory.clone(), transport)
            .dispatch(&job_posted("1"), &users(&["alice"]))
            .await
            .unwrap();

        assert_eq!(summary.expired, 2);
        let mut retired = directory.retired();
        retired.sort();
        assert_eq!(
            retired,
            vec!["https://push.example/gone-1", "https://push.example/gone-2"]
        );
    }

    #[tokio::test]
    async fn test_failed_retirement_keeps_expired_classification() {
        let directory = Arc::new(RecordingDirectory {
            fail_retirements: true,
            ..RecordingDirectory::default()
        });
        directory.register("alice", "https://push.example/gone");
        let transport =
            Arc::new(ScriptedTransport::default().with("https://push.example/gone", Reply::Gone));

        let dispatcher = dispatcher(directory.clone(), transport);
        let summary = dispatcher
            .dispatch(&job_posted("1"), &users(&["alice"]))
            .await
            .unwrap();

        assert_eq!(summary.expired, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(directory.retired().len(), 1);
        assert_eq!(dispatcher.stats().retirements_failed, 1);
    }
}

// =============================================================================
// Recipient handling tests
// =============================================================================

mod recipient_tests {
    use super::*;

    #[tokio::test]
    async fn test_recipient_without_endpoints_contributes_nothing() {
        let directory = Arc::new(RecordingDirectory::default());
        let transport = Arc::new(ScriptedTransport::default());

        let summary = dispatcher(directory.clone(), transport.clone())
            .dispatch(&job_posted("1"), &users(&["nobody"]))
            .await
            .unwrap();

        assert_eq!(summary, BatchSummary::default());
        assert!(transport.calls().is_empty());
        assert!(directory.retired().is_empty());
    }

    #[tokio::test]
    async fn test_directory_failure_skips_only_that_recipient() {
        let directory = Arc::new(RecordingDirectory {
            failing_recipients: vec!["broken".to_string()],
            ..RecordingDirectory::default()
        });
        directory.register("alice", "https://push.example/alice");
        let transport = Arc::new(ScriptedTransport::default());

        let summary = dispatcher(directory.clone(), transport)
            .dispatch(&job_posted("1"), &users(&["broken", "alice"]))
            .await
            .unwrap();

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.total(), 1);
        assert_eq!(directory.lookups().len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_recipient_is_processed_twice() {
        let directory = Arc::new(RecordingDirectory::default());
        directory.register("alice", "https://push.example/alice");
        let transport = Arc::new(ScriptedTransport::default());

        let summary = dispatcher(directory.clone(), transport.clone())
            .dispatch(&job_posted("1"), &users(&["alice", "alice"]))
            .await
            .unwrap();

        assert_eq!(summary.sent, 2);
        assert_eq!(transport.calls().len(), 2);
        assert_eq!(directory.lookups(), vec!["alice", "alice"]);
    }

    #[tokio::test]
    async fn test_endpoints_of_one_recipient_are_sent_concurrently() {
        let directory = Arc::new(RecordingDirectory::default());
        for device in 0..3 {
            directory.register("alice", &format!("https://push.example/d{}", device));
        }
        let transport = Arc::new(ScriptedTransport::default());

        dispatcher(directory, transport.clone())
            .dispatch(&job_posted("1"), &users(&["alice"]))
            .await
            .unwrap();

        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_incomplete_endpoint_is_an_error_not_a_crash() {
        let directory = Arc::new(RecordingDirectory::default());
        directory
            .inner
            .register("alice", Endpoint::new("https://push.example/nokeys", "", ""));
        directory.register("alice", "https://push.example/good");
        let transport = Arc::new(ScriptedTransport::default());

        let summary = dispatcher(directory, transport.clone())
            .dispatch(&job_posted("1"), &users(&["alice"]))
            .await
            .unwrap();

        assert_eq!(summary.sent, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(transport.calls().len(), 1);
    }
}

// =============================================================================
// Validation and payload tests
// =============================================================================

mod request_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_title_is_rejected_before_any_io() {
        let directory = Arc::new(RecordingDirectory::default());
        directory.register("alice", "https://push.example/alice");
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = dispatcher(directory.clone(), transport.clone());

        let intent = NotificationIntent::new("job_posted", "", "Body");
        let err = assert_err!(dispatcher.dispatch(&intent, &users(&["alice"])).await);

        assert!(matches!(err, DispatchError::InvalidRequest(ref m) if m.contains("title")));
        assert!(directory.lookups().is_empty());
        assert!(transport.calls().is_empty());
        assert_eq!(dispatcher.stats().rejected_batches, 1);
        assert_eq!(dispatcher.stats().batches, 0);
    }

    #[tokio::test]
    async fn test_empty_recipient_list_is_rejected() {
        let directory = Arc::new(RecordingDirectory::default());
        let transport = Arc::new(ScriptedTransport::default());

        let err = assert_err!(
            dispatcher(directory.clone(), transport)
                .dispatch(&job_posted("1"), &[])
                .await
        );

        assert!(matches!(err, DispatchError::InvalidRequest(ref m) if m.contains("user_ids")));
        assert!(directory.lookups().is_empty());
    }

    #[tokio::test]
    async fn test_every_endpoint_receives_the_same_payload_and_ttl() {
        let directory = Arc::new(RecordingDirectory::default());
        directory.register("alice", "https://push.example/a");
        directory.register("bob", "https://push.example/b");
        let transport = Arc::new(ScriptedTransport::default());

        dispatcher(directory, transport.clone())
            .dispatch(&job_posted("42"), &users(&["alice", "bob"]))
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, calls[1].1);
        assert!(calls.iter().all(|(_, _, ttl)| *ttl == Duration::from_secs(86_400)));

        let payload: Value = serde_json::from_str(&calls[0].1).unwrap();
        assert_eq!(payload["title"], "New job");
        assert_eq!(payload["tag"], "job_posted");
        assert_eq!(payload["icon"], "/favicon.svg");
        assert_eq!(payload["data"]["url"], "https://app.example.com/?view=job&id=42");
        assert_eq!(payload["data"]["job_id"], "42");
        assert_eq!(payload["actions"], json!([{"action": "view", "title": "Ver oferta"}]));
        assert_eq!(payload["requireInteraction"], false);
    }

    #[tokio::test]
    async fn test_stats_accumulate_across_batches() {
        let directory = Arc::new(RecordingDirectory::default());
        directory.register("alice", "https://push.example/a");
        let transport = Arc::new(ScriptedTransport::default());
        let dispatcher = dispatcher(directory, transport);

        for _ in 0..3 {
            dispatcher
                .dispatch(&job_posted("1"), &users(&["alice", "bob"]))
                .await
                .unwrap();
        }

        let stats = dispatcher.stats();
        assert_eq!(stats.batches, 3);
        assert_eq!(stats.recipients, 6);
        assert_eq!(stats.sent, 3);
    }
}
