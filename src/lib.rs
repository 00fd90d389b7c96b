//! Imgsearch Core Library
//!
//! This library provides the core functionality for the imgsearch proxy,
//! which turns a page-limited image search API into a flat, cached result
//! list per query and saves chosen results to local storage.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`search`] - Upstream page client, per-query result cache and aggregator
//! - [`download`] - Extension inference and streamed downloads
//! - [`keywords`] - Keyword list loading and `term | timecode` parsing
//! - [`service`] - Request validation and orchestration over shared state
//! - [`server`] - HTTP routes under `/api`

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod download;
pub mod http_client;
pub mod keywords;
pub mod search;
pub mod server;
pub mod service;
#[cfg(test)]
pub(crate) mod test_support;
pub(crate) mod user_agent;

// Re-export commonly used types
pub use download::{DownloadError, DownloadRequest, ImageDownloader};
pub use http_client::build_http_client;
pub use keywords::{KeywordEntry, KeywordError, load_keywords, parse_keyword_lines};
pub use search::{Aggregator, GoogleImageClient, ResultCache, ResultItem, SearchError};
pub use service::{ImageSearchService, SearchParams, ServiceConfig, ServiceError};
