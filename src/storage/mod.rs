// Storage layer: the single in-memory dataset behind the API

pub mod memory;

pub use memory::*;

use std::sync::Arc;

use crate::models::{Dataset, PaginatedResponse};

/// Access to the current dataset.
///
/// Every operation succeeds: out-of-range pages produce an empty window,
/// never an error.
pub trait Storage: Send + Sync {
    /// Replace the current dataset wholesale.
    fn store(&self, dataset: Dataset);

    /// The current dataset.
    fn get_all(&self) -> Arc<Dataset>;

    /// Rows `[(page - 1) * per_page, page * per_page)`, clamped to the data.
    fn get_paginated(&self, page: usize, per_page: usize) -> PaginatedResponse;

    /// Case-insensitive substring search over every field, paginated like
    /// [`Storage::get_paginated`] with `total` set to the match count.
    fn search(&self, query: &str, page: usize, per_page: usize) -> PaginatedResponse;

    /// Reset to the empty dataset.
    fn clear(&self);
}

/// Half-open `[start, end)` window for a page, clamped to `total`.
pub(crate) fn page_window(page: usize, per_page: usize, total: usize) -> (usize, usize) {
    let start = page
        .saturating_sub(1)
        .saturating_mul(per_page)
        .min(total);
    let end = start.saturating_add(per_page).min(total);
    (start, end)
}
