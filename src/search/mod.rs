//! Paginated image search aggregation with a per-query result cache.
//!
//! The upstream search API returns at most ten results per request and stops
//! paginating after start index 91. This module turns that into a single flat
//! list per query that grows on demand and is served from memory afterwards.
//!
//! # Architecture
//!
//! - [`PageSource`] - Async trait for fetching one page of upstream results
//! - [`GoogleImageClient`] - [`PageSource`] backed by the Custom Search JSON API
//! - [`ResultCache`] - Per-query accumulated results with per-query locking
//! - [`Aggregator`] - Grows cached lists page by page until a requested total
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use imgsearch_core::search::{Aggregator, GoogleImageClient, ResultCache, SearchCredentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GoogleImageClient::new(reqwest::Client::new());
//! let aggregator = Aggregator::new(Arc::new(client), Arc::new(ResultCache::new()));
//!
//! let credentials = SearchCredentials::new("api-key", "engine-id");
//! let results = aggregator.get_results("red panda", &credentials, 25).await?;
//! println!("{} results", results.len());
//! # Ok(())
//! # }
//! ```

mod aggregator;
mod cache;
mod client;
mod error;
mod item;

pub use aggregator::{Aggregator, DEFAULT_TOTAL, MAX_TOTAL, clamp_total, parse_total};
pub use cache::ResultCache;
pub use client::{
    DEFAULT_SEARCH_ENDPOINT, GoogleImageClient, MAX_PAGE_SIZE, MAX_START_INDEX, PageOutcome,
    PageRequest, PageSource, SearchCredentials,
};
pub use error::SearchError;
pub use item::{RawItem, ResultItem};
