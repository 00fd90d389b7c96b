//! The image search service: owns the result cache, aggregator and downloader.
//!
//! This is the layer the HTTP routes and the CLI call into. It validates raw
//! request parameters, delegates to [`Aggregator`] / [`ImageDownloader`], and
//! logs every failure with context before handing it back.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::download::{
    DEFAULT_SAVE_DIR, DownloadError, DownloadRequest, ExtensionResolver, ImageDownloader,
};
use crate::download::constants::{DOWNLOAD_TIMEOUT_SECS, PROBE_TIMEOUT_SECS};
use crate::http_client::build_http_client;
use crate::keywords::{KeywordError, default_keyword_files, load_keywords};
use crate::search::{
    Aggregator, DEFAULT_SEARCH_ENDPOINT, GoogleImageClient, PageSource, ResultCache, ResultItem,
    SearchCredentials, SearchError, parse_total,
};

/// Default timeout for one upstream page request (30 seconds).
pub const SEARCH_TIMEOUT_SECS: u64 = 30;

/// Runtime settings for [`ImageSearchService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base directory for per-query download folders.
    pub save_dir: PathBuf,
    /// Keyword files tried in order by [`ImageSearchService::keywords`].
    pub keyword_files: Vec<PathBuf>,
    /// Upstream search API endpoint.
    pub search_endpoint: String,
    /// Timeout for each upstream page request.
    pub search_timeout: Duration,
    /// Timeout for the streamed image request.
    pub download_timeout: Duration,
    /// Timeout for the extension `HEAD` probe.
    pub probe_timeout: Duration,
    /// TCP connect timeout for the shared HTTP client.
    pub connect_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            save_dir: PathBuf::from(DEFAULT_SAVE_DIR),
            keyword_files: default_keyword_files(),
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            search_timeout: Duration::from_secs(SEARCH_TIMEOUT_SECS),
            download_timeout: Duration::from_secs(DOWNLOAD_TIMEOUT_SECS),
            probe_timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(crate::http_client::CONNECT_TIMEOUT_SECS),
        }
    }
}

/// Request-level validation failures (reported to clients as 400).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing query")]
    MissingQuery,
    #[error("Missing API configuration")]
    MissingApiConfig,
    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

/// Any failure surfaced by the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Keywords(#[from] KeywordError),
}

impl ServiceError {
    /// Returns true when the caller's request was at fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Download(error) => error.is_client_error(),
            Self::Search(_) | Self::Keywords(_) => false,
        }
    }
}

/// Raw search parameters as received from a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub q: Option<String>,
    pub api_key: Option<String>,
    pub cx: Option<String>,
    /// Requested result count; non-numeric values fall back to 10.
    pub total: Option<String>,
}

impl SearchParams {
    /// Creates parameters with all fields present.
    pub fn new(
        q: impl Into<String>,
        api_key: impl Into<String>,
        cx: impl Into<String>,
        total: usize,
    ) -> Self {
        Self {
            q: Some(q.into()),
            api_key: Some(api_key.into()),
            cx: Some(cx.into()),
            total: Some(total.to_string()),
        }
    }

    /// Builds parameters from a raw `application/x-www-form-urlencoded` query.
    ///
    /// Unknown keys are ignored; a repeated key keeps its first value.
    #[must_use]
    pub fn from_query_string(raw: Option<&str>) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
            let slot = match key.as_ref() {
                "q" => &mut params.q,
                "apiKey" => &mut params.api_key,
                "cx" => &mut params.cx,
                "total" => &mut params.total,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }

    fn validate(&self) -> Result<(&str, SearchCredentials, usize), ValidationError> {
        let query = self
            .q
            .as_deref()
            .filter(|q| !q.is_empty())
            .ok_or(ValidationError::MissingQuery)?;
        let api_key = self.api_key.as_deref().filter(|k| !k.is_empty());
        let cx = self.cx.as_deref().filter(|c| !c.is_empty());
        let (Some(api_key), Some(cx)) = (api_key, cx) else {
            return Err(ValidationError::MissingApiConfig);
        };
        Ok((
            query,
            SearchCredentials::new(api_key, cx),
            parse_total(self.total.as_deref()),
        ))
    }
}

/// Search, download and keyword operations over one shared result cache.
///
/// Cheap to share behind `Arc`; all state is internally synchronized.
#[derive(Debug)]
pub struct ImageSearchService {
    aggregator: Aggregator,
    downloader: ImageDownloader,
    keyword_files: Vec<PathBuf>,
}

impl ImageSearchService {
    /// Builds the service and its HTTP client from `config`.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the HTTP client cannot be built.
    pub fn new(config: &ServiceConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config.connect_timeout)?;
        let source = GoogleImageClient::with_endpoint(client.clone(), &config.search_endpoint)
            .timeout(config.search_timeout);
        let downloader = ImageDownloader::new(client.clone(), &config.save_dir)
            .timeout(config.download_timeout)
            .extension_resolver(ExtensionResolver::new(client).probe_timeout(config.probe_timeout));

        Ok(Self::from_parts(
            Arc::new(source),
            Arc::new(ResultCache::new()),
            downloader,
            config.keyword_files.clone(),
        ))
    }

    /// Assembles a service from explicit components (used by tests).
    #[must_use]
    pub fn from_parts(
        source: Arc<dyn PageSource>,
        cache: Arc<ResultCache>,
        downloader: ImageDownloader,
        keyword_files: Vec<PathBuf>,
    ) -> Self {
        Self {
            aggregator: Aggregator::new(source, cache),
            downloader,
            keyword_files,
        }
    }

    /// The cache backing every search.
    #[must_use]
    pub fn cache(&self) -> &Arc<ResultCache> {
        self.aggregator.cache()
    }

    /// Base directory downloads are saved under.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        self.downloader.save_dir()
    }

    /// Validates `params` and returns up to `total` aggregated results.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Validation`] for missing parameters,
    /// [`ServiceError::Search`] when an upstream page fetch fails.
    #[instrument(skip_all, fields(query = ?params.q))]
    pub async fn search(&self, params: &SearchParams) -> Result<Vec<ResultItem>, ServiceError> {
        let (query, credentials, total) = params.validate().inspect_err(|e| {
            warn!(error = %e, "rejected search request");
        })?;

        match self.aggregator.get_results(query, &credentials, total).await {
            Ok(results) => {
                info!(total, returned = results.len(), "search served");
                Ok(results)
            }
            Err(e) => {
                let cached = self.cache().cached_len(query).await;
                error!(
                    total,
                    cached,
                    error = %e,
                    detail = ?e.upstream_detail(),
                    "search failed"
                );
                Err(e.into())
            }
        }
    }

    /// Saves one result to disk and returns the absolute file path.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Download`] for missing fields, invalid input,
    /// network, HTTP status or filesystem failures.
    #[instrument(skip_all, fields(id = ?request.id, query = ?request.query))]
    pub async fn download(&self, request: &DownloadRequest) -> Result<PathBuf, ServiceError> {
        match self.downloader.download(request).await {
            Ok(path) => Ok(path),
            Err(e) if e.is_client_error() => {
                warn!(error = %e, "rejected download request");
                Err(e.into())
            }
            Err(e) => {
                error!(url = ?request.image_url, error = %e, "download failed");
                Err(e.into())
            }
        }
    }

    /// Returns the keyword list (empty when no keyword file exists).
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Keywords`] when an existing file cannot be read.
    pub async fn keywords(&self) -> Result<Vec<String>, ServiceError> {
        load_keywords(&self.keyword_files).await.map_err(|e| {
            error!(error = %e, "failed to load keywords");
            ServiceError::from(e)
        })
    }
}
