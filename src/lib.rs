// CSV Viewer - upload a CSV file, then page through and search its rows over HTTP

pub mod config;
pub mod ingest;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use models::{AppState, Dataset, Row};
pub use storage::{MemoryStorage, Storage};

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
