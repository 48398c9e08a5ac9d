//! Static File Serving
//!
//! Serves a built frontend (the single-page app that drives the API) from a
//! configured directory. Unknown paths fall back to `index.html` so client
//! side routing keeps working.

use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

/// Attach the frontend as the router's fallback, if the directory exists.
pub fn with_frontend(router: Router, static_dir: &Path) -> Router {
    if !static_dir.is_dir() {
        warn!(path = %static_dir.display(), "Static files directory not found, serving API only");
        return router;
    }

    info!(path = %static_dir.display(), "Serving frontend");
    let serve_dir = ServeDir::new(static_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(static_dir.join("index.html")));

    router.fallback_service(serve_dir)
}
