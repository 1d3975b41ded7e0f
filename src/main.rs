use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

mod config;
mod handlers;
mod logging;
mod metrics;
mod middleware;
mod server;

use config::{Args, Config};

/// Shared application state available to every handler via `State<Arc<AppState>>`.
pub struct AppState {
    pub config: Config,

    /// Written by the middleware and the sampler, read by the API handlers.
    pub metrics: Arc<metrics::MetricsStore>,

    /// Anchor for `/api/summary` uptime.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: Config, metrics: Arc<metrics::MetricsStore>) -> Self {
        Self {
            config,
            metrics,
            started_at: Instant::now(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::try_from(Args::parse())?;
    logging::init_logging();

    // ── 1. Metrics store + background sampler ────────────────────
    let store = Arc::new(metrics::MetricsStore::new(config.history_size));
    let cancel = CancellationToken::new();
    let sampler = metrics::Sampler::new(store.clone(), config.refresh_interval)
        .spawn(cancel.clone());

    // ── 2. Build Axum router ─────────────────────────────────────
    let addr = config.listen_addr();
    let state = Arc::new(AppState::new(config, store));
    let app = server::create_router(state.clone());

    // ── 3. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "starting traffic monitor server");
    info!(interval = ?state.config.refresh_interval, "metrics collection interval");
    info!(points = state.config.history_size, "history size");
    info!("test endpoint available at http://{addr}/api/test");
    info!("web interface available at http://{addr}/");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await
        .context("server exited with error")?;

    // Covers a serve() that returned without a signal.
    cancel.cancel();
    sampler.await.context("sampler task panicked")?;

    info!("server exited");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM and stops the sampler.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutting down server...");
    cancel.cancel();
}
