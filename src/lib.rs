// Infrastructure layer (shared components)
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod metrics;
pub mod telemetry;

// Domain layer
pub mod directory;
pub mod notification;
pub mod transport;

// Application layer
pub mod api;
pub mod server;
