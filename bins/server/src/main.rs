//! Imagestore API Server
//!
//! Main entry point for the image file store service.

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use imagestore_api::{AppState, create_router};
use imagestore_core::storage::StorageConfig;
use imagestore_shared::{AppConfig, LogConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config.log);

    // Create storage backend
    let storage_config = StorageConfig::from(&config.storage);
    let storage = storage_config
        .provider
        .build()
        .context("Failed to initialize storage backend")?;
    info!(
        backend = storage.name(),
        max_upload_size = storage_config.max_file_size,
        "Storage configured"
    );

    let state = AppState::new(storage, storage_config.upload_limit())
        .with_request_timeout(config.server.request_timeout());
    let app = create_router(state);

    // Start server
    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server listening on {}", addr);

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();

    tokio::select! {
        result = server => {
            result?;
            info!("Server stopped");
        }
        () = shutdown_deadline(signalled_rx, config.server.shutdown_timeout()) => {
            warn!(
                timeout_secs = config.server.shutdown_timeout_secs,
                "Graceful shutdown timed out, dropping remaining connections"
            );
        }
    }

    Ok(())
}

/// Resolves `timeout` after the shutdown signal fires, never before.
async fn shutdown_deadline(signalled: oneshot::Receiver<()>, timeout: Duration) {
    if signalled.await.is_ok() {
        tokio::time::sleep(timeout).await;
    } else {
        std::future::pending::<()>().await;
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("imagestore={0},imagestore_api={0},imagestore_core={0},tower_http={0}", log.level)
            .into()
    });

    let (json, pretty) = if log.json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}
