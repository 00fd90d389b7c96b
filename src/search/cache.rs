//! Per-query accumulated search results.
//!
//! Each query maps to its own `tokio::sync::Mutex<Vec<ResultItem>>`. The
//! aggregator holds that lock across the whole check-fetch-append sequence, so
//! two requests for the same query never race, while different queries proceed
//! independently.
//!
//! Lists only ever grow: items are appended in fetch order and never removed
//! or reordered. There is no eviction; the cache lives as long as its owner.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::item::ResultItem;

/// Process-lifetime cache of aggregated results, keyed by the raw query string.
///
/// Designed to be wrapped in `Arc` and shared by every request handler.
#[derive(Debug, Default)]
pub struct ResultCache {
    /// Uses Arc so the `DashMap` shard lock is released before awaiting the
    /// per-query mutex (prevents holding a shard lock across await).
    entries: DashMap<String, Arc<Mutex<Vec<ResultItem>>>>,
}

impl ResultCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, query: &str) -> Arc<Mutex<Vec<ResultItem>>> {
        if let Some(existing) = self.entries.get(query) {
            return Arc::clone(existing.value());
        }
        Arc::clone(
            self.entries
                .entry(query.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
                .value(),
        )
    }

    /// Locks the result list for `query`, creating an empty one if needed.
    ///
    /// The guard gives exclusive access for the rest of the fetch; callers
    /// must only append to the list.
    pub async fn lock(&self, query: &str) -> OwnedMutexGuard<Vec<ResultItem>> {
        self.slot(query).lock_owned().await
    }

    /// Returns a copy of everything cached for `query` (empty if never fetched).
    pub async fn snapshot(&self, query: &str) -> Vec<ResultItem> {
        let Some(slot) = self.entries.get(query).map(|e| Arc::clone(e.value())) else {
            return Vec::new();
        };
        let items = slot.lock().await;
        items.clone()
    }

    /// Number of items cached for `query`.
    pub async fn cached_len(&self, query: &str) -> usize {
        let Some(slot) = self.entries.get(query).map(|e| Arc::clone(e.value())) else {
            return 0;
        };
        let items = slot.lock().await;
        items.len()
    }

    /// Number of distinct queries that have a cache slot.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.entries.len()
    }
}
