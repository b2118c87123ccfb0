//! PostgreSQL connection management for the subscription directory.

mod pool;

pub use pool::{PostgresPool, PostgresPoolError};
