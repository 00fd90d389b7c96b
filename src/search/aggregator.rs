//! Aggregation of upstream pages into per-query result lists.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::cache::ResultCache;
use super::client::{
    MAX_PAGE_SIZE, MAX_START_INDEX, PageOutcome, PageRequest, PageSource, SearchCredentials,
};
use super::error::SearchError;
use super::item::ResultItem;

/// Total used when the caller does not supply a usable number.
pub const DEFAULT_TOTAL: usize = 10;

/// Upper bound on results per query (upstream pagination ceiling).
pub const MAX_TOTAL: usize = 100;

/// Clamps a requested total into `1..=MAX_TOTAL`.
#[must_use]
pub fn clamp_total(requested: i128) -> usize {
    // Bounded to 1..=100 before the cast.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = requested.clamp(1, MAX_TOTAL as i128) as usize;
    clamped
}

/// Parses a raw `total` parameter, defaulting to [`DEFAULT_TOTAL`] when it is
/// missing or not an integer, then clamps it.
#[must_use]
pub fn parse_total(raw: Option<&str>) -> usize {
    let parsed = raw
        .map(str::trim)
        .and_then(|value| value.parse::<i128>().ok());
    match parsed {
        Some(value) => clamp_total(value),
        None => DEFAULT_TOTAL,
    }
}

/// Grows cached per-query result lists from a [`PageSource`].
///
/// Each call locks the query's cache slot for its whole duration, so
/// concurrent requests for one query are served one after another and the
/// later ones usually hit the cache.
pub struct Aggregator {
    source: Arc<dyn PageSource>,
    cache: Arc<ResultCache>,
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("cached_queries", &self.cache.query_count())
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    /// Creates an aggregator over `source`, storing results in `cache`.
    #[must_use]
    pub fn new(source: Arc<dyn PageSource>, cache: Arc<ResultCache>) -> Self {
        Self { source, cache }
    }

    /// Returns the cache this aggregator fills.
    #[must_use]
    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Returns up to `requested_total` results for `query`, fetching more
    /// pages from upstream only when the cache holds fewer.
    ///
    /// `requested_total` is clamped to `1..=100`. The result may be shorter
    /// than requested when upstream runs out of results or the start-index
    /// ceiling is reached; that is not an error.
    ///
    /// # Cache postcondition
    ///
    /// Fetched items are appended to the cache as each page arrives. When an
    /// upstream error aborts the loop, every item from earlier pages of this
    /// call is already cached, so a retry resumes from there.
    ///
    /// # Errors
    ///
    /// Returns the first [`SearchError`] reported by the page source. No
    /// partial result is returned in that case.
    #[instrument(skip_all, fields(query = %query, total = tracing::field::Empty))]
    pub async fn get_results(
        &self,
        query: &str,
        credentials: &SearchCredentials,
        requested_total: usize,
    ) -> Result<Vec<ResultItem>, SearchError> {
        let total = clamp_total(i128::try_from(requested_total).unwrap_or(i128::MAX));
        tracing::Span::current().record("total", total);

        let mut items = self.cache.lock(query).await;

        if items.len() >= total {
            debug!(cached = items.len(), "serving cached results");
            return Ok(items[..total].to_vec());
        }

        info!(
            need = total,
            cached = items.len(),
            "fetching additional results from upstream"
        );

        while items.len() < total {
            let start_index = next_start_index(items.len());
            if start_index > MAX_START_INDEX {
                debug!(start_index, "start index ceiling reached");
                break;
            }
            let count = page_size(total, items.len());

            let request = PageRequest {
                query,
                credentials,
                start_index,
                count,
            };

            let page = match self.source.fetch_page(&request).await {
                Ok(PageOutcome::Items(page)) => page,
                Ok(PageOutcome::Exhausted) => {
                    debug!(start_index, "upstream exhausted");
                    break;
                }
                Err(error) => {
                    warn!(
                        start_index,
                        cached = items.len(),
                        error = %error,
                        "upstream page fetch failed"
                    );
                    return Err(error);
                }
            };

            for raw in page {
                let id = items.len() as u64 + 1;
                items.push(ResultItem::from_raw(id, raw));
            }
        }

        info!(cached = items.len(), "search results updated");

        let end = items.len().min(total);
        Ok(items[..end].to_vec())
    }
}

fn next_start_index(cached: usize) -> u32 {
    u32::try_from(cached).map_or(u32::MAX, |n| n.saturating_add(1))
}

fn page_size(total: usize, cached: usize) -> u32 {
    let remaining = total.saturating_sub(cached);
    u32::try_from(remaining).map_or(MAX_PAGE_SIZE, |n| n.min(MAX_PAGE_SIZE))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::search::RawItem;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct Call {
        start_index: u32,
        count: u32,
    }

    /// Page source backed by a fixed number of upstream results.
    ///
    /// `fail_at` makes the request with that start index fail.
    struct ScriptedSource {
        available: u32,
        fail_at: Option<u32>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedSource {
        fn new(available: u32) -> Self {
            Self {
                available,
                fail_at: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_at(available: u32, start_index: u32) -> Self {
            Self {
                fail_at: Some(start_index),
                ..Self::new(available)
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<PageOutcome, SearchError> {
            self.calls.lock().unwrap().push(Call {
                start_index: request.start_index,
                count: request.count,
            });
            if self.fail_at == Some(request.start_index) {
                return Err(SearchError::upstream(500, r#"{"error":"backend"}"#));
            }
            let first = request.start_index;
            let last = (first + request.count - 1).min(self.available);
            if first > last {
                return Ok(PageOutcome::Exhausted);
            }
            let items = (first..=last)
                .map(|n| RawItem {
                    link: Some(format!("https://img.test/{}/{n}.jpg", request.query)),
                    title: Some(format!("result {n}")),
                    image: None,
                    display_link: Some("img.test".to_string()),
                    mime: Some("image/jpeg".to_string()),
                    file_format: None,
                })
                .collect();
            Ok(PageOutcome::Items(items))
        }
    }

    fn aggregator(source: Arc<ScriptedSource>) -> Aggregator {
        Aggregator::new(source, Arc::new(ResultCache::new()))
    }

    fn credentials() -> SearchCredentials {
        SearchCredentials::new("key", "cx")
    }

    fn ids(items: &[ResultItem]) -> Vec<u64> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_parse_total_defaults_and_clamps() {
        assert_eq!(parse_total(None), 10);
        assert_eq!(parse_total(Some("abc")), 10);
        assert_eq!(parse_total(Some("2.5")), 10);
        assert_eq!(parse_total(Some(" 25 ")), 25);
        assert_eq!(parse_total(Some("0")), 1);
        assert_eq!(parse_total(Some("-4")), 1);
        assert_eq!(parse_total(Some("500")), 100);
        assert_eq!(parse_total(Some("99999999999999999999")), 100);
    }

    #[tokio::test]
    async fn test_ids_contiguous_and_bounded_for_every_total() {
        let source = Arc::new(ScriptedSource::new(1_000));
        let aggregator = aggregator(Arc::clone(&source));
        let creds = credentials();

        for total in 1..=100 {
            let results = aggregator.get_results("cats", &creds, total).await.unwrap();
            assert_eq!(results.len(), total);
            let expected: Vec<u64> = (1..=total as u64).collect();
            assert_eq!(ids(&results), expected);
        }
    }

    #[tokio::test]
    async fn test_repeat_request_is_pure_cache_hit() {
        let source = Arc::new(ScriptedSource::new(50));
        let aggregator = aggregator(Arc::clone(&source));
        let creds = credentials();

        let first = aggregator.get_results("cats", &creds, 5).await.unwrap();
        let calls_after_first = source.calls().len();
        let second = aggregator.get_results("cats", &creds, 5).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(calls_after_first, 1);
        assert_eq!(source.calls().len(), calls_after_first);
    }

    #[tokio::test]
    async fn test_growth_keeps_earlier_items_as_prefix() {
        let source = Arc::new(ScriptedSource::new(50));
        let aggregator = aggregator(Arc::clone(&source));
        let creds = credentials();

        let small = aggregator.get_results("cats", &creds, 5).await.unwrap();
        let large = aggregator.get_results("cats", &creds, 20).await.unwrap();

        assert_eq!(large.len(), 20);
        assert_eq!(&large[..5], &small[..]);
        assert_eq!(
            source.calls(),
            [
                Call { start_index: 1, count: 5 },
                Call { start_index: 6, count: 10 },
                Call { start_index: 16, count: 5 },
            ]
        );
    }

    #[tokio::test]
    async fn test_exhaustion_returns_partial_results() {
        let source = Arc::new(ScriptedSource::new(30));
        let aggregator = aggregator(Arc::clone(&source));
        let creds = credentials();

        let results = aggregator.get_results("cats", &creds, 50).await.unwrap();

        assert_eq!(results.len(), 30);
        assert_eq!(source.calls().last().unwrap().start_index, 31);
        assert_eq!(aggregator.cache().cached_len("cats").await, 30);
    }

    #[tokio::test]
    async fn test_start_index_never_exceeds_ceiling() {
        let source = Arc::new(ScriptedSource::new(1_000));
        let aggregator = aggregator(Arc::clone(&source));
        let creds = credentials();

        let results = aggregator.get_results("cats", &creds, 100).await.unwrap();

        assert_eq!(results.len(), 100);
        assert!(source.calls().iter().all(|c| c.start_index <= MAX_START_INDEX));
        assert_eq!(source.calls().len(), 10);
    }

    #[tokio::test]
    async fn test_oversized_total_is_clamped() {
        let source = Arc::new(ScriptedSource::new(1_000));
        let aggregator = aggregator(Arc::clone(&source));
        let creds = credentials();

        let results = aggregator.get_results("cats", &creds, 5_000).await.unwrap();
        assert_eq!(results.len(), 100);

        let results = aggregator.get_results("dogs", &creds, 0).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn test_upstream_error_keeps_fetched_pages_in_cache() {
        let source = Arc::new(ScriptedSource::failing_at(100, 21));
        let aggregator = aggregator(Arc::clone(&source));
        let creds = credentials();

        let error = aggregator.get_results("cats", &creds, 40).await.unwrap_err();
        assert!(matches!(error, SearchError::Upstream { status: 500, .. }));

        let cached = aggregator.cache().snapshot("cats").await;
        assert_eq!(ids(&cached), (1..=20).collect::<Vec<u64>>());

        // Smaller requests are now served from what survived the failure.
        let calls_before = source.calls().len();
        let results = aggregator.get_results("cats", &creds, 15).await.unwrap();
        assert_eq!(results.len(), 15);
        assert_eq!(source.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_retry_after_failure_resumes_from_cache() {
        let failing = Arc::new(ScriptedSource::failing_at(100, 11));
        let cache = Arc::new(ResultCache::new());
        let creds = credentials();

        let first = Aggregator::new(failing, Arc::clone(&cache));
        assert!(first.get_results("cats", &creds, 30).await.is_err());

        let healthy = Arc::new(ScriptedSource::new(100));
        let second = Aggregator::new(Arc::clone(&healthy) as Arc<dyn PageSource>, cache);
        let results = second.get_results("cats", &creds, 30).await.unwrap();

        assert_eq!(ids(&results), (1..=30).collect::<Vec<u64>>());
        assert_eq!(healthy.calls().first().unwrap().start_index, 11);
    }

    #[tokio::test]
    async fn test_smaller_total_after_overfetch_is_cache_hit() {
        let source = Arc::new(ScriptedSource::new(100));
        let aggregator = aggregator(Arc::clone(&source));
        let creds = credentials();

        let large = aggregator.get_results("cats", &creds, 25).await.unwrap();
        let calls = source.calls().len();
        let small = aggregator.get_results("cats", &creds, 7).await.unwrap();

        assert_eq!(&large[..7], &small[..]);
        assert_eq!(source.calls().len(), calls);
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_same_query_fetch_once() {
        let source = Arc::new(ScriptedSource::new(100));
        let aggregator = Arc::new(aggregator(Arc::clone(&source)));
        let creds = credentials();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                let creds = creds.clone();
                tokio::spawn(async move { aggregator.get_results("cats", &creds, 20).await })
            })
            .collect();

        for handle in handles {
            let results = handle.await.unwrap().unwrap();
            assert_eq!(ids(&results), (1..=20).collect::<Vec<u64>>());
        }
        assert_eq!(source.calls().len(), 2);
        assert_eq!(aggregator.cache().cached_len("cats").await, 20);
    }
}
