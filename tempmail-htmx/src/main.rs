//! tempmail-htmx server
//!
//! Loads configuration, installs logging and serves the web client until
//! Ctrl+C or SIGTERM.

use anyhow::Context;
use tempmail_htmx::config::TempmailConfig;
use tempmail_htmx::observability;
use tempmail_htmx::state::AppState;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init()?;

    let config = match std::env::args().nth(1) {
        Some(path) => TempmailConfig::load_from(&path)?,
        None => TempmailConfig::load()?,
    };
    let addr = config.server.bind_addr();
    let state = AppState::with_config(config)?;
    let app = tempmail_htmx::router(state)?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
