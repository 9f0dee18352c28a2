//! HTTP server startup logic.

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::config::{HttpServerConfig, SHUTDOWN_GRACE_SECS};

use super::shutdown;

/// Server startup error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind server to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Bind the configured address and serve `app` until a shutdown signal.
///
/// After SIGTERM/SIGINT the listener stops accepting connections and in-flight
/// requests get up to [`SHUTDOWN_GRACE_SECS`] to finish before the remaining
/// connections are dropped.
pub async fn serve(app: Router, config: &HttpServerConfig) -> Result<(), ServerError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

    match listener.local_addr() {
        Ok(local) => tracing::info!(addr = %local, "Starting HTTP server"),
        Err(_) => tracing::info!(%addr, "Starting HTTP server"),
    }

    let draining = Arc::new(Notify::new());
    let signal = {
        let draining = draining.clone();
        async move {
            shutdown::shutdown_signal().await;
            draining.notify_one();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();

    let deadline = async {
        draining.notified().await;
        tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_SECS)).await;
    };

    tokio::select! {
        result = server => {
            result?;
            tracing::info!("Server stopped");
        }
        _ = deadline => {
            tracing::warn!(
                grace_secs = SHUTDOWN_GRACE_SECS,
                "Shutdown grace period elapsed, dropping remaining connections"
            );
        }
    }

    Ok(())
}
