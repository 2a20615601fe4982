//! Benchmark metrics HTTP API.
//!
//! Serves the currently published snapshot in the Prometheus text format.
//! Every scrape renders whatever snapshot the store holds at that moment,
//! so scrapes never block on, or observe, a cycle in progress.
//!
//! # Routes
//!
//! - `GET /metrics`: `dockle_cis_benchmarks_total` series
//! - `GET /healthz`: liveness probe

use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use dockle_exporter_collector::SnapshotStore;

/// Prometheus text exposition content type.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Build the API router over a snapshot store.
pub fn router(store: Arc<SnapshotStore>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(store)
}

async fn metrics_handler(State(store): State<Arc<SnapshotStore>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], store.render())
}

async fn healthz_handler() -> &'static str {
    "ok"
}

/// Bind the API listener.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn bind(listen_addr: &str) -> Result<TcpListener> {
    TcpListener::bind(listen_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind API listener on {}: {}", listen_addr, e))
}

/// Serve the API until `cancel` fires, then shut down gracefully.
pub async fn serve(
    listener: TcpListener,
    store: Arc<SnapshotStore>,
    cancel: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(listen_addr = %addr, "benchmark metrics API listening");

    axum::serve(listener, router(store))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|e| anyhow::anyhow!("API server failed: {}", e))?;

    tracing::info!("benchmark metrics API stopped");
    Ok(())
}
