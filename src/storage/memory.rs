use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::{debug, info};

use super::{page_window, Storage};
use crate::models::{Dataset, PaginatedResponse, Row};

/// Holds the current dataset in memory.
///
/// The lock guards a shared handle rather than the rows themselves: writers
/// swap in a new handle, so a reader that already cloned the old one keeps a
/// consistent view.
pub struct MemoryStorage {
    data: RwLock<Arc<Dataset>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(Arc::new(Dataset::empty())),
        }
    }

    // The guarded value is always a whole handle, so a poisoned lock is
    // still safe to read.
    fn read(&self) -> RwLockReadGuard<'_, Arc<Dataset>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, dataset: Arc<Dataset>) {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = dataset;
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn store(&self, dataset: Dataset) {
        info!(
            rows = dataset.total(),
            columns = dataset.headers().len(),
            "Storing dataset"
        );
        self.replace(Arc::new(dataset));
    }

    fn get_all(&self) -> Arc<Dataset> {
        Arc::clone(&self.read())
    }

    fn get_paginated(&self, page: usize, per_page: usize) -> PaginatedResponse {
        let data = self.read();
        let total = data.total();
        let (start, end) = page_window(page, per_page, total);

        PaginatedResponse {
            data: data.rows()[start..end].to_vec(),
            total,
            page,
            per_page,
            headers: data.headers().to_vec(),
        }
    }

    fn search(&self, query: &str, page: usize, per_page: usize) -> PaginatedResponse {
        let data = self.read();
        let needle = query.to_lowercase();

        let matches: Vec<&Row> = data
            .rows()
            .iter()
            .filter(|row| row_matches(row, &needle))
            .collect();

        let total = matches.len();
        let (start, end) = page_window(page, per_page, total);
        debug!(query, matches = total, "Search completed");

        PaginatedResponse {
            data: matches[start..end].iter().map(|row| (*row).clone()).collect(),
            total,
            page,
            per_page,
            headers: data.headers().to_vec(),
        }
    }

    fn clear(&self) {
        info!("Clearing dataset");
        self.replace(Arc::new(Dataset::empty()));
    }
}

/// `needle` must already be lowercase.
fn row_matches(row: &Row, needle: &str) -> bool {
    row.values()
        .any(|value| value.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn row(fields: &[(&str, &str)]) -> Row {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn numbered(count: usize) -> Dataset {
        let rows = (0..count).map(|i| row(&[("ID", i.to_string().as_str())])).collect();
        Dataset::new(headers(&["ID"]), rows)
    }

    fn ids(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|r| r["ID"].clone()).collect()
    }

    fn people() -> Dataset {
        Dataset::new(
            headers(&["Name", "City"]),
            vec![
                row(&[("Name", "John"), ("City", "New York")]),
                row(&[("Name", "Jane"), ("City", "London")]),
                row(&[("Name", "Bob"), ("City", "New York")]),
            ],
        )
    }

    #[test]
    fn test_new_storage_is_empty() {
        let store = MemoryStorage::new();
        let data = store.get_all();
        assert!(data.headers().is_empty());
        assert_eq!(data.total(), 0);
    }

    #[test]
    fn test_store_and_get_all() {
        let store = MemoryStorage::new();
        let dataset = Dataset::new(
            headers(&["Name", "Age"]),
            vec![
                row(&[("Name", "John"), ("Age", "30")]),
                row(&[("Name", "Jane"), ("Age", "25")]),
            ],
        );

        store.store(dataset.clone());

        let retrieved = store.get_all();
        assert_eq!(retrieved.total(), 2);
        assert_eq!(*retrieved, dataset);
    }

    #[test]
    fn test_store_replaces_previous_dataset() {
        let store = MemoryStorage::new();
        store.store(people());
        let second = numbered(4);
        store.store(second.clone());

        let retrieved = store.get_all();
        assert_eq!(*retrieved, second);
        assert_eq!(retrieved.headers(), ["ID".to_string()]);
    }

    #[test]
    fn test_reader_handle_survives_replacement() {
        let store = MemoryStorage::new();
        store.store(people());
        let before = store.get_all();

        store.store(numbered(1));

        assert_eq!(*before, people());
        assert_eq!(store.get_all().total(), 1);
    }

    #[test]
    fn test_get_paginated_windows() {
        let store = MemoryStorage::new();
        store.store(numbered(100));

        let first = store.get_paginated(1, 10);
        assert_eq!(ids(&first.data), (0..10).map(|i| i.to_string()).collect::<Vec<_>>());
        assert_eq!(first.total, 100);
        assert_eq!((first.page, first.per_page), (1, 10));
        assert_eq!(first.headers, headers(&["ID"]));

        let last = store.get_paginated(10, 10);
        assert_eq!(ids(&last.data), (90..100).map(|i| i.to_string()).collect::<Vec<_>>());
        assert_eq!(last.total, 100);

        let past = store.get_paginated(11, 10);
        assert!(past.data.is_empty());
        assert_eq!(past.total, 100);
        assert_eq!(past.page, 11);
    }

    #[test]
    fn test_get_paginated_total_independent_of_page() {
        let store = MemoryStorage::new();
        store.store(numbered(37));

        for page in 1..=6 {
            assert_eq!(store.get_paginated(page, 8).total, 37);
        }
    }

    #[test]
    fn test_get_paginated_round_trip() {
        let store = MemoryStorage::new();
        let dataset = people();
        store.store(dataset.clone());

        let result = store.get_paginated(1, dataset.total());
        assert_eq!(result.data, dataset.rows());
        assert_eq!(result.headers, dataset.headers());
    }

    #[test]
    fn test_get_paginated_on_empty_store() {
        let store = MemoryStorage::new();
        let result = store.get_paginated(1, 50);
        assert!(result.data.is_empty());
        assert_eq!(result.total, 0);
        assert!(result.headers.is_empty());
    }

    #[test]
    fn test_search() {
        let store = MemoryStorage::new();
        store.store(people());

        let result = store.search("New York", 1, 10);
        assert_eq!(result.total, 2);
        let names: Vec<_> = result.data.iter().map(|r| r["Name"].as_str()).collect();
        assert_eq!(names, ["John", "Bob"]);

        let result = store.search("jane", 1, 10);
        assert_eq!(result.total, 1);
        assert_eq!(result.data[0]["Name"], "Jane");

        let result = store.search("NonExistent", 1, 10);
        assert!(result.data.is_empty());
        assert_eq!(result.total, 0);
        assert_eq!(result.headers, headers(&["Name", "City"]));
    }

    #[test]
    fn test_search_uppercase_query() {
        let store = MemoryStorage::new();
        store.store(people());

        assert_eq!(store.search("LONDON", 1, 10).total, 1);
        assert_eq!(store.search("ew yo", 1, 10).total, 2);
    }

    #[test]
    fn test_search_empty_query_matches_everything() {
        let store = MemoryStorage::new();
        store.store(people());

        let result = store.search("", 1, 10);
        assert_eq!(result.total, 3);
        assert_eq!(result.data, people().rows());
    }

    #[test]
    fn test_search_paginates_matches() {
        let store = MemoryStorage::new();
        let rows = (0..25)
            .map(|i| {
                let city = if i % 2 == 0 { "Paris" } else { "Rome" };
                row(&[("ID", i.to_string().as_str()), ("City", city)])
            })
            .collect();
        store.store(Dataset::new(headers(&["ID", "City"]), rows));

        let page = store.search("paris", 2, 5);
        assert_eq!(page.total, 13);
        assert_eq!(ids(&page.data), ["10", "12", "14", "16", "18"]);

        let past = store.search("paris", 4, 5);
        assert!(past.data.is_empty());
        assert_eq!(past.total, 13);
    }

    #[test]
    fn test_search_sparse_rows() {
        let store = MemoryStorage::new();
        store.store(Dataset::new(
            headers(&["Name", "City"]),
            vec![row(&[("Name", "Ann")]), row(&[("Name", "Bo"), ("City", "Annecy")])],
        ));

        assert_eq!(store.search("ann", 1, 10).total, 2);
        assert_eq!(store.search("city", 1, 10).total, 0);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = MemoryStorage::new();
        store.store(people());

        store.clear();
        let first = store.get_all();
        store.clear();
        let second = store.get_all();

        assert_eq!(*first, Dataset::empty());
        assert_eq!(*first, *second);
        assert!(second.headers().is_empty());
        assert!(second.rows().is_empty());
        assert_eq!(second.total(), 0);
    }

    #[test]
    fn test_concurrent_readers_never_see_mixed_data() {
        let store = MemoryStorage::new();
        let small = numbered(3);
        let large = people();
        store.store(small.clone());

        thread::scope(|s| {
            s.spawn(|| {
                for i in 0..500 {
                    if i % 2 == 0 {
                        store.store(large.clone());
                    } else {
                        store.store(small.clone());
                    }
                }
            });

            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..500 {
                        let data = store.get_all();
                        assert!(*data == small || *data == large);

                        let page = store.get_paginated(1, 10);
                        assert_eq!(page.data.len(), page.total);
                        if page.headers == small.headers() {
                            assert_eq!(page.data, small.rows());
                        } else {
                            assert_eq!(page.data, large.rows());
                        }
                    }
                });
            }
        });
    }
}
