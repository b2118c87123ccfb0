use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::infrastructure::CircuitBreaker;
use crate::notification::PushDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub dispatcher: Arc<PushDispatcher>,
    /// Breaker guarding the PostgreSQL directory, when that backend is in use
    pub directory_breaker: Option<Arc<CircuitBreaker>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(settings: Settings, dispatcher: Arc<PushDispatcher>) -> Self {
        Self {
            settings: Arc::new(settings),
            dispatcher,
            directory_breaker: None,
            started_at: Utc::now(),
        }
    }

    pub fn with_directory_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.directory_breaker = Some(breaker);
        self
    }
}
