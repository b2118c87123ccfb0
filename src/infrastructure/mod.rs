//! Infrastructure shared by the directory backends:
//! - `circuit_breaker`: trips after repeated backing-store failures
//! - `postgres`: connection pool guarded by the circuit breaker

pub mod circuit_breaker;
pub mod postgres;

pub use circuit_breaker::{
    CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState,
};
pub use postgres::{PostgresPool, PostgresPoolError};

pub(crate) fn current_time_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
