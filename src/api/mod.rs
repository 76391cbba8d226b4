//! HTTP facade embedding the backtesting core.
//!
//! Endpoints:
//! - `POST /api/v1/backtest` — fetch market data and run one backtest
//! - `POST /api/v1/backtest/compare` — run several variations over one fetch
//! - `GET /api/v1/rank` — rank locations by canonical oracle profit
//! - `GET /api/v1/strategies` — strategy catalog

mod handlers;
mod types;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::data::GridStatusClient;

/// Immutable application state shared across all request handlers.
///
/// The upstream client is configured once at startup (the server owns the
/// API key); per-run state lives inside each request.
pub struct AppState {
    /// Grid Status client used for every fetch.
    pub client: GridStatusClient,
    /// Directory holding battery preset TOML files.
    pub battery_dir: PathBuf,
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/backtest", post(handlers::run_backtest))
        .route("/api/v1/backtest/compare", post(handlers::compare_backtests))
        .route("/api/v1/rank", get(handlers::rank_locations))
        .route("/api/v1/strategies", get(handlers::list_strategies))
        .with_state(state)
}

/// Binds to the given address and serves the API.
///
/// # Errors
///
/// Returns an `io::Error` if the TCP listener cannot bind or the server
/// fails while running.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
