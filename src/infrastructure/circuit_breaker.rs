//! Circuit breaker guarding calls into the subscription store

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU8, Ordering};
use std::time::Duration;

use serde::Serialize;

use super::current_time_ms;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CircuitState {
    /// Calls flow through normally
    Closed = 0,
    /// Calls are rejected without touching the store
    Open = 1,
    /// Up to `max_probes` calls at a time are let through
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

impl CircuitState {
    /// Numeric gauge value (0=closed, 1=open, 2=half-open)
    pub fn as_gauge(self) -> i64 {
        self as u8 as i64
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Successful probes before a half-open circuit closes
    pub success_threshold: u32,
    /// How long an open circuit rejects calls before probing
    pub reset_timeout: Duration,
    /// Concurrent probe calls allowed while half-open
    pub max_probes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
            max_probes: 2,
        }
    }
}

/// Lock-free circuit breaker.
///
/// Shared between concurrent recipient lookups, so every counter is atomic.
/// Calls go through `try_acquire`; the returned `CallPermit` reports the
/// outcome, and a permit dropped unsettled gives its half-open slot back.
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
    probe_successes: AtomicU32,
    probes_in_flight: AtomicU32,
    /// ms since epoch
    changed_at: AtomicI64,
}

impl CircuitBreaker {
    pub fn new(name: &'static str) -> Self {
        Self::with_config(name, CircuitBreakerConfig::default())
    }

    pub fn with_config(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            state: AtomicU8::new(CircuitState::Closed as u8),
            consecutive_failures: AtomicU32::new(0),
            probe_successes: AtomicU32::new(0),
            probes_in_flight: AtomicU32::new(0),
            changed_at: AtomicI64::new(current_time_ms()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current state; an open circuit past its reset timeout reads as half-open.
    pub fn state(&self) -> CircuitState {
        self.maybe_half_open();
        self.raw_state()
    }

    /// Permission for one call, `None` while the circuit is open or every
    /// half-open probe slot is taken.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let probe = match self.state() {
            CircuitState::Closed => false,
            CircuitState::Open => return None,
            CircuitState::HalfOpen => {
                if !self.acquire_probe() {
                    return None;
                }
                true
            }
        };

        Some(CallPermit {
            breaker: self,
            probe,
            settled: false,
        })
    }

    /// Report a success observed outside a permit.
    pub fn record_success(&self) {
        self.settle_success(false);
    }

    /// Report a failure observed outside a permit.
    pub fn record_failure(&self) {
        self.settle_failure(false);
    }

    fn settle_success(&self, probe: bool) {
        match self.raw_state() {
            CircuitState::Closed => {
                self.consecutive_failures.store(0, Ordering::Release);
            }
            CircuitState::HalfOpen => {
                if probe {
                    self.release_probe();
                }
                let successes = self.probe_successes.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.success_threshold {
                    self.transition_to(CircuitState::Closed);
                    tracing::info!(breaker = self.name, "Circuit breaker closed after recovery");
                }
            }
            CircuitState::Open => {}
        }
    }

    fn settle_failure(&self, probe: bool) {
        match self.raw_state() {
            CircuitState::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    self.transition_to(CircuitState::Open);
                    tracing::warn!(
                        breaker = self.name,
                        failures = failures,
                        reset_timeout_ms = self.config.reset_timeout.as_millis() as u64,
                        "Circuit breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                if probe {
                    self.release_probe();
                }
                self.transition_to(CircuitState::Open);
                tracing::warn!(breaker = self.name, "Circuit breaker reopened by failed probe");
            }
            // A straggler failing while open restarts the timeout.
            CircuitState::Open => {
                self.changed_at.store(current_time_ms(), Ordering::Release);
            }
        }
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        CircuitBreakerStats {
            state: self.state(),
            consecutive_failures: self.consecutive_failures.load(Ordering::Acquire),
            probe_successes: self.probe_successes.load(Ordering::Acquire),
            probes_in_flight: self.probes_in_flight.load(Ordering::Acquire),
            changed_at_ms: self.changed_at.load(Ordering::Acquire),
        }
    }

    fn raw_state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Acquire))
    }

    fn maybe_half_open(&self) {
        if self.raw_state() != CircuitState::Open {
            return;
        }

        let open_for = current_time_ms() - self.changed_at.load(Ordering::Acquire);
        if open_for < self.config.reset_timeout.as_millis() as i64 {
            return;
        }

        // Only the caller that wins the exchange resets the probe counters.
        if self
            .state
            .compare_exchange(
                CircuitState::Open as u8,
                CircuitState::HalfOpen as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            self.probe_successes.store(0, Ordering::Release);
            self.probes_in_flight.store(0, Ordering::Release);
            self.changed_at.store(current_time_ms(), Ordering::Release);
            tracing::info!(breaker = self.name, "Circuit breaker half-open, probing");
        }
    }

    fn acquire_probe(&self) -> bool {
        let max = self.config.max_probes;
        self.probes_in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .is_ok()
    }

    fn release_probe(&self) {
        let _ = self
            .probes_in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    fn transition_to(&self, next: CircuitState) {
        self.state.store(next as u8, Ordering::Release);
        self.changed_at.store(current_time_ms(), Ordering::Release);
        self.probe_successes.store(0, Ordering::Release);
        self.probes_in_flight.store(0, Ordering::Release);
        if next == CircuitState::Closed {
            self.consecutive_failures.store(0, Ordering::Release);
        }
    }
}

/// One admitted call. Settle it with `success` or `failure`; dropping it
/// unsettled (a cancelled future) frees its half-open slot without counting
/// either way.
#[must_use = "settle the permit with `success` or `failure`"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    probe: bool,
    settled: bool,
}

impl CallPermit<'_> {
    pub fn success(mut self) {
        self.settled = true;
        self.breaker.settle_success(self.probe);
    }

    pub fn failure(mut self) {
        self.settled = true;
        self.breaker.settle_failure(self.probe);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            tracing::debug!(breaker = self.breaker.name, "Abandoned half-open permit released");
            self.breaker.release_probe();
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub probe_successes: u32,
    pub probes_in_flight: u32,
    pub changed_at_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failures: u32, reset_ms: u64) -> CircuitBreaker {
        CircuitBreaker::with_config(
            "test",
            CircuitBreakerConfig {
                failure_threshold: failures,
                success_threshold: 2,
                reset_timeout: Duration::from_millis(reset_ms),
                max_probes: 2,
            },
        )
    }

    fn open_then_wait(cb: &CircuitBreaker) {
        for _ in 0..cb.config.failure_threshold {
            cb.record_failure();
        }
        std::thread::sleep(cb.config.reset_timeout + Duration::from_millis(10));
    }

    #[test]
    fn test_starts_closed() {
        let cb = CircuitBreaker::new("directory");
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.try_acquire().is_some());
        assert_eq!(cb.name(), "directory");
    }

    #[test]
    fn test_opens_after_threshold() {
        let cb = breaker(3, 60_000);

        cb.try_acquire().unwrap().failure();
        cb.try_acquire().unwrap().failure();
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.try_acquire().unwrap().failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(cb.try_acquire().is_none());
        assert_eq!(cb.state().as_gauge(), 1);
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let cb = breaker(3, 60_000);

        cb.record_failure();
        cb.record_failure();
        cb.try_acquire().unwrap().success();
        cb.record_failure();
        cb.record_failure();

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.stats().consecutive_failures, 2);
    }

    #[test]
    fn test_half_open_limits_probes() {
        let cb = breaker(1, 10);
        open_then_wait(&cb);

        assert_eq!(cb.state(), CircuitState::HalfOpen);
        let first = cb.try_acquire().unwrap();
        let _second = cb.try_acquire().unwrap();
        assert!(cb.try_acquire().is_none());
        assert_eq!(cb.stats().probes_in_flight, 2);

        first.success();
        assert!(cb.try_acquire().is_some());
    }

    #[test]
    fn test_half_open_closes_after_successful_probes() {
        let cb = breaker(1, 10);
        open_then_wait(&cb);

        cb.try_acquire().unwrap().success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.try_acquire().unwrap().success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.stats().probes_in_flight, 0);
    }

    #[test]
    fn test_failed_probe_reopens() {
        let cb = breaker(1, 10);
        open_then_wait(&cb);

        cb.try_acquire().unwrap().failure();
        assert_eq!(cb.raw_state(), CircuitState::Open);
    }

    #[test]
    fn test_abandoned_permits_free_their_slots() {
        let cb = breaker(1, 10);
        open_then_wait(&cb);

        let first = cb.try_acquire().unwrap();
        let second = cb.try_acquire().unwrap();
        assert!(cb.try_acquire().is_none());

        drop(first);
        drop(second);

        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.stats().probes_in_flight, 0);
        assert_eq!(cb.stats().probe_successes, 0);
        cb.try_acquire().unwrap().success();
        cb.try_acquire().unwrap().success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
