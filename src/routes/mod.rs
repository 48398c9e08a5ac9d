//! API Routes
//!
//! - `POST /api/upload` - Upload a CSV file (multipart field `file`)
//! - `GET /api/data` - Paginated rows
//! - `GET /api/search` - Paginated substring search
//! - `DELETE /api/clear` - Drop the dataset
//! - `GET /api/health` - Health check
//! - `/` - Static frontend, when `STATIC_DIR` is configured

pub mod data;
pub mod health;
pub mod static_files;

use std::time::Duration;

use axum::{http::StatusCode, Router};
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::config::ServerConfig;
use crate::middleware::cors_layer;
use crate::models::AppState;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    info!("Creating application router");

    let server = state.config.server.clone();

    let mut app = Router::new()
        .merge(data::router(state.clone()))
        .merge(health::router(state));

    if let Some(static_dir) = server.static_dir.as_deref() {
        app = static_files::with_frontend(app, static_dir);
    }

    with_middleware(app, &server)
}

/// CORS, per-request timeout, request tracing and panic recovery.
fn with_middleware(router: Router, server: &ServerConfig) -> Router {
    router
        .layer(cors_layer(server))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_secs),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}
