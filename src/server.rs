use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::traffic;
use crate::AppState;

/// Builds the full Axum `Router` with all routes, middleware, and static serving.
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = ServeDir::new(&state.config.static_dir);

    Router::new()
        // ── Metrics ─────────────────────────────────────────────
        .route("/api/metrics", get(stream::get_metrics))
        .route("/api/history", get(stream::get_history))
        .route("/api/summary", get(stream::get_summary))
        .route("/api/metrics/stream", get(stream::metrics_stream))
        // ── Liveness ────────────────────────────────────────────
        .route("/api/health", get(handlers::health::health))
        // ── Traffic generator ───────────────────────────────────
        .route(
            "/api/test",
            get(handlers::probe::probe).post(handlers::probe::probe),
        )
        // ── Dashboard and other static files ────────────────────
        .fallback_service(static_dir)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            traffic::traffic_middleware,
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
