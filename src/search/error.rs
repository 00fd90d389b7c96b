//! Error types for the search module.

use thiserror::Error;

/// Errors that can occur while fetching results from the upstream search API.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error querying search API: {source}")]
    Network {
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before the upstream API answered.
    #[error("timeout querying search API (start={start_index})")]
    Timeout {
        /// Start index of the page that timed out.
        start_index: u32,
    },

    /// Upstream answered with a non-2xx status.
    ///
    /// `detail` carries the upstream error body when it was valid JSON.
    #[error("search API returned HTTP {status}")]
    Upstream {
        /// The HTTP status code.
        status: u16,
        /// Structured error payload supplied by the upstream API, if parseable.
        detail: Option<serde_json::Value>,
    },

    /// Upstream answered 2xx but the body was not a recognizable result page.
    #[error("unexpected search API response: {reason}")]
    InvalidResponse {
        /// Why the body was rejected.
        reason: String,
    },

    /// Page parameters outside the upstream API limits.
    #[error("invalid page request: start={start_index}, count={count}")]
    InvalidPageRequest {
        /// Requested 1-based start index.
        start_index: u32,
        /// Requested page size.
        count: u32,
    },

    /// The configured search endpoint is not a valid URL.
    #[error("invalid search endpoint: {endpoint}")]
    InvalidEndpoint {
        /// The rejected endpoint string.
        endpoint: String,
    },
}

impl SearchError {
    /// Creates a network error from a reqwest error.
    pub fn network(source: reqwest::Error) -> Self {
        Self::Network { source }
    }

    /// Creates a timeout error for the page starting at `start_index`.
    pub fn timeout(start_index: u32) -> Self {
        Self::Timeout { start_index }
    }

    /// Creates an upstream status error, keeping the body only if it parses as JSON.
    pub fn upstream(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body).ok();
        Self::Upstream { status, detail }
    }

    /// Creates an invalid-response error.
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            reason: reason.into(),
        }
    }

    /// Returns the structured upstream error payload, if one was captured.
    #[must_use]
    pub fn upstream_detail(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Upstream { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }
}
