//! Upstream page fetching for the Custom Search JSON API (image mode).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use super::error::SearchError;
use super::item::RawItem;

/// Default Custom Search JSON API endpoint.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://www.googleapis.com/customsearch/v1";

/// Maximum results the upstream API returns per request.
pub const MAX_PAGE_SIZE: u32 = 10;

/// Highest start index the upstream API accepts (results 91..=100).
pub const MAX_START_INDEX: u32 = 91;

/// Default per-request timeout for page fetches.
const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// API key and search engine id forwarded to the upstream API.
#[derive(Clone, PartialEq, Eq)]
pub struct SearchCredentials {
    pub api_key: String,
    pub cx: String,
}

impl SearchCredentials {
    /// Creates credentials from an API key and a search engine id.
    pub fn new(api_key: impl Into<String>, cx: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            cx: cx.into(),
        }
    }
}

impl std::fmt::Debug for SearchCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchCredentials")
            .field("api_key", &"<redacted>")
            .field("cx", &self.cx)
            .finish()
    }
}

/// Parameters for a single page fetch.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub query: &'a str,
    pub credentials: &'a SearchCredentials,
    /// 1-based index of the first result on the page (1..=91).
    pub start_index: u32,
    /// Number of results wanted (1..=10).
    pub count: u32,
}

impl PageRequest<'_> {
    fn validate(&self) -> Result<(), SearchError> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.count)
            || !(1..=MAX_START_INDEX).contains(&self.start_index)
        {
            return Err(SearchError::InvalidPageRequest {
                start_index: self.start_index,
                count: self.count,
            });
        }
        Ok(())
    }
}

/// Result of a successful page fetch.
#[derive(Debug, Clone)]
pub enum PageOutcome {
    /// One or more results, in upstream order.
    Items(Vec<RawItem>),
    /// Upstream has no results at this start index; pagination must stop.
    Exhausted,
}

/// Source of paginated search results.
///
/// Implementations issue exactly one upstream request per call and never retry.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches one page of results.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport failure, timeout, non-2xx status,
    /// or an unparseable response body.
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<PageOutcome, SearchError>;
}

#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    items: Option<Vec<RawItem>>,
}

/// [`PageSource`] backed by the Custom Search JSON API.
#[derive(Debug, Clone)]
pub struct GoogleImageClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl GoogleImageClient {
    /// Creates a client for the default endpoint with a 30 second timeout.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_endpoint(client, DEFAULT_SEARCH_ENDPOINT)
    }

    /// Creates a client for a custom endpoint (for testing with wiremock).
    #[must_use]
    pub fn with_endpoint(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn page_url(&self, request: &PageRequest<'_>) -> Result<Url, SearchError> {
        let mut url = Url::parse(&self.endpoint).map_err(|_| SearchError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
        })?;
        url.query_pairs_mut()
            .append_pair("key", &request.credentials.api_key)
            .append_pair("cx", &request.credentials.cx)
            .append_pair("q", request.query)
            .append_pair("searchType", "image")
            .append_pair("num", &request.count.to_string())
            .append_pair("start", &request.start_index.to_string());
        Ok(url)
    }
}

#[async_trait]
impl PageSource for GoogleImageClient {
    #[instrument(
        skip(self, request),
        fields(query = %request.query, start = request.start_index, num = request.count)
    )]
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<PageOutcome, SearchError> {
        request.validate()?;
        let url = self.page_url(request)?;

        debug!("requesting search page");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::timeout(request.start_index)
                } else {
                    SearchError::network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "search API returned error status");
            return Err(SearchError::upstream(status.as_u16(), &body));
        }

        let page = response.json::<SearchPage>().await.map_err(|e| {
            if e.is_timeout() {
                SearchError::timeout(request.start_index)
            } else {
                SearchError::invalid_response(e.to_string())
            }
        })?;

        match page.items {
            Some(items) if !items.is_empty() => {
                debug!(items = items.len(), "received search page");
                Ok(PageOutcome::Items(items))
            }
            _ => {
                debug!("search page empty, upstream exhausted");
                Ok(PageOutcome::Exhausted)
            }
        }
    }
}
