//! Saving search results to local storage.
//!
//! This module streams a chosen image to `<save_dir>/<sanitized query>/<id><ext>`.
//!
//! # Features
//!
//! - Streaming downloads through an 8 KiB write buffer
//! - Extension inference: URL path, then a `HEAD` probe, then `.jpg`
//! - Per-query folders created on demand
//! - Structured error types with full context
//!
//! # Example
//!
//! ```no_run
//! use imgsearch_core::download::{DownloadRequest, ImageDownloader};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let downloader = ImageDownloader::new(reqwest::Client::new(), "./downloaded_images");
//! let request = DownloadRequest::new(1, "https://example.com/cat.png", "cats");
//! let file_path = downloader.download(&request).await?;
//! println!("Saved: {}", file_path.display());
//! # Ok(())
//! # }
//! ```

mod client;
pub(crate) mod constants;
mod error;
mod extension;
mod storage;

pub use client::{DownloadRequest, ImageDownloader};
pub use constants::{DEFAULT_SAVE_DIR, DOWNLOAD_CHUNK_SIZE};
pub use error::DownloadError;
pub use extension::{
    ExtensionResolver, FALLBACK_EXTENSION, extension_for_content_type, extension_from_url_path,
};
pub use storage::{ensure_query_folder, query_folder, sanitize_query_folder, target_file_name};

// Note: no module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
