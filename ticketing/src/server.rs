//! HTTP server lifecycle.
//!
//! Runs the router from `ticket-web` until a shutdown future resolves, then
//! gives in-flight requests a bounded grace period.

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use ticket_web::{AppState, build_router};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// Serve `state` on `listener` until `shutdown` resolves.
///
/// After the shutdown future fires, the server stops accepting connections
/// and waits up to `grace` for in-flight requests before returning.
///
/// # Errors
///
/// Returns an error if the server fails while running.
pub async fn serve_until<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
    grace: Duration,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let app = build_router(state);
    let stop = Arc::new(Notify::new());
    let graceful = {
        let stop = Arc::clone(&stop);
        async move { stop.notified().await }
    };

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP server listening");
    }

    let mut server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .into_future(),
    );

    tokio::select! {
        joined = &mut server => {
            return Ok(joined??);
        }
        () = shutdown => {}
    }

    // notify_one stores a permit, so the signal is not lost if the server
    // has not polled its shutdown future yet.
    stop.notify_one();
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => {
            joined??;
            info!("HTTP server stopped");
        }
        Err(_) => {
            warn!(
                grace_secs = grace.as_secs(),
                "Shutdown grace period elapsed, aborting in-flight requests"
            );
            server.abort();
        }
    }
    Ok(())
}

/// Graceful shutdown signal handler.
///
/// Resolves on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
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
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
