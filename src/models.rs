use std::collections::BTreeMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::config::Config;
use crate::storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub config: Config,
}

/// One CSV record keyed by column name. Columns missing from a short
/// record are simply absent.
pub type Row = BTreeMap<String, String>;

/// The tabular dataset held by the store.
///
/// `total` is always derived from `rows`, so it cannot drift out of sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// The canonical empty dataset: no headers, no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Serialize for Dataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Dataset", 3)?;
        state.serialize_field("headers", &self.headers)?;
        state.serialize_field("rows", &self.rows)?;
        state.serialize_field("total", &self.total())?;
        state.end()
    }
}

// API Request/Response types

/// Raw `page`/`per_page`/`q` query parameters.
///
/// Kept as strings so a malformed number falls back to the default
/// instead of rejecting the request.
#[derive(Debug, Default, serde::Deserialize)]
pub struct PageQuery {
    pub q: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PER_PAGE: usize = 50;

impl PageQuery {
    pub fn page(&self) -> usize {
        positive_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    pub fn per_page(&self) -> usize {
        positive_or(self.per_page.as_deref(), DEFAULT_PER_PAGE)
    }

    pub fn query(&self) -> &str {
        self.q.as_deref().unwrap_or_default()
    }
}

fn positive_or(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PaginatedResponse {
    pub data: Vec<Row>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub headers: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub row_count: usize,
    pub headers: Vec<String>,
    pub sample_data: Vec<Row>,
    /// Records dropped because they could not be parsed.
    pub skipped_rows: usize,
}

#[derive(Debug, serde::Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, serde::Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub row_count: usize,
}
