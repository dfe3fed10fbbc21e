//! HTTP surface: snapshot reads and inbound remote readings.
//!
//! Routes:
//! - `POST /update`: remote device pushes `{"temperature", "humidity"}`
//! - `GET /data`: full snapshot as JSON
//! - `GET /health`: liveness check
//! - `GET /favicon.ico`: 204

pub mod handlers;

use std::sync::Arc;

use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::fusion::{ErrorBounds, FusionEngine};
use crate::weather::WeatherBoard;

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// The fusion engine.
    pub engine: Arc<FusionEngine>,
    /// Weather cache.
    pub weather: Arc<WeatherBoard>,
    /// Accuracy stamped onto every pushed reading.
    pub remote_bounds: ErrorBounds,
}

/// Build the router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/update", post(handlers::post_update))
        .route("/data", get(handlers::get_data))
        .route("/health", get(handlers::health))
        .route("/favicon.ico", get(handlers::favicon))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the shutdown signal flips, then drain in-flight requests.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = listener.local_addr().context("listener has no address")?;
    info!(%addr, "http server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await
        .context("http server failed")?;

    info!("http server stopped");
    Ok(())
}
