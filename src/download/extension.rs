//! File extension resolution for image URLs.
//!
//! Resolution order:
//! 1. Extension of the last URL path segment (case preserved, no network)
//! 2. `Content-Type` of a `HEAD` probe, mapped through a fixed MIME table
//! 3. [`FALLBACK_EXTENSION`]

use std::time::Duration;

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use super::constants::PROBE_TIMEOUT_SECS;

/// Extension used when neither the URL nor a probe yields one.
pub const FALLBACK_EXTENSION: &str = ".jpg";

/// Returns the extension of the URL's last path segment, including the dot.
///
/// A leading dot (`/.hidden`) or a trailing dot (`/pic.`) is not an extension.
/// The query string and fragment are ignored.
#[must_use]
pub fn extension_from_url_path(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let dot_index = last_segment.rfind('.')?;
    if dot_index == 0 || dot_index + 1 == last_segment.len() {
        return None;
    }
    Some(last_segment[dot_index..].to_string())
}

/// Maps a `Content-Type` header value to a file extension.
///
/// Parameters (`; charset=...`) are ignored and matching is case-insensitive.
/// Returns `None` for types outside the table.
#[must_use]
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    let extension = match mime.as_str() {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => ".jpg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/svg+xml" => ".svg",
        "image/bmp" | "image/x-ms-bmp" => ".bmp",
        "image/tiff" => ".tiff",
        "image/x-icon" | "image/vnd.microsoft.icon" => ".ico",
        "image/avif" => ".avif",
        "image/heic" => ".heic",
        "image/heif" => ".heif",
        "application/pdf" => ".pdf",
        "text/html" => ".html",
        "text/plain" => ".txt",
        "application/json" => ".json",
        _ => return None,
    };
    Some(extension)
}

/// Resolves file extensions, probing the server only when the URL has none.
#[derive(Debug, Clone)]
pub struct ExtensionResolver {
    client: Client,
    probe_timeout: Duration,
}

impl ExtensionResolver {
    /// Creates a resolver with the default 5 second probe timeout.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            probe_timeout: Duration::from_secs(PROBE_TIMEOUT_SECS),
        }
    }

    /// Overrides the probe timeout.
    #[must_use]
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Returns an extension for `url`, always non-empty and starting with `.`.
    ///
    /// Never fails: probe errors, timeouts, non-2xx responses and unknown
    /// content types all fall back to [`FALLBACK_EXTENSION`].
    #[instrument(skip(self), fields(url = %url))]
    pub async fn resolve(&self, url: &str) -> String {
        if let Some(extension) = extension_from_url_path(url) {
            debug!(%extension, "extension from URL path");
            return extension;
        }

        match self.probe(url).await {
            Some(extension) => {
                debug!(extension, "extension from content-type probe");
                extension.to_string()
            }
            None => {
                debug!(extension = FALLBACK_EXTENSION, "using fallback extension");
                FALLBACK_EXTENSION.to_string()
            }
        }
    }

    async fn probe(&self, url: &str) -> Option<&'static str> {
        let response = match self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "extension probe failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(status = response.status().as_u16(), "extension probe rejected");
            return None;
        }

        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(extension_for_content_type)
    }
}
