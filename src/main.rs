use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;

use push_fanout_service::config::Settings;
use push_fanout_service::directory::create_directory;
use push_fanout_service::infrastructure::{CircuitBreaker, PostgresPool};
use push_fanout_service::notification::PushDispatcher;
use push_fanout_service::server::{create_app, AppState};
use push_fanout_service::telemetry::init_telemetry;
use push_fanout_service::transport::GatewayTransport;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::new()?;
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    // Directory backend
    let mut directory_breaker = None;
    let pool = if settings.directory.backend == "postgres" {
        let breaker = Arc::new(CircuitBreaker::new("directory"));
        directory_breaker = Some(breaker.clone());
        Some(PostgresPool::connect(&settings.database, breaker).await?)
    } else {
        None
    };
    let directory = create_directory(&settings.directory, pool.clone());

    // Push transport
    let transport = Arc::new(GatewayTransport::new(&settings.push)?);
    tracing::info!(
        gateway = %settings.push.gateway_url,
        ttl_seconds = settings.push.ttl_seconds,
        "Push gateway transport ready"
    );

    let dispatcher = Arc::new(PushDispatcher::new(&settings.push, directory, transport));

    let mut state = AppState::new(settings.clone(), dispatcher);
    if let Some(breaker) = directory_breaker {
        state = state.with_directory_breaker(breaker);
    }

    let app = create_app(state);

    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
