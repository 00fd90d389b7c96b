//! Streaming image downloader.
//!
//! This module provides the [`ImageDownloader`] struct which saves a search
//! result to `<save_dir>/<sanitized query>/<id><ext>`, streaming the body to
//! disk instead of buffering it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{DOWNLOAD_CHUNK_SIZE, DOWNLOAD_TIMEOUT_SECS};
use super::error::DownloadError;
use super::extension::ExtensionResolver;
use super::storage::{ensure_query_folder, target_file_name};

/// Body of a download request: which result to save, from where, under which query.
///
/// Every field is optional at the type level so that absent fields surface
/// as [`DownloadError::MissingField`] rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequest {
    /// Accepts a JSON number or a numeric string (`"3"`).
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: Option<u64>,
    pub image_url: Option<String>,
    pub query: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

/// An empty string counts as absent; any other non-integer string is rejected
/// so it can never reach the file name.
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(id)) => Ok(Some(id)),
        Some(RawId::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed.parse::<u64>().map(Some).map_err(|_| {
                D::Error::custom(format!("invalid id {text:?}: expected a positive integer"))
            })
        }
    }
}

impl DownloadRequest {
    /// Creates a fully populated request.
    pub fn new(id: u64, image_url: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            image_url: Some(image_url.into()),
            query: Some(query.into()),
        }
    }

    /// Checks that all three fields are present and non-empty.
    ///
    /// An id of `0` counts as missing (ids are 1-based).
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::MissingField`] naming the first missing field.
    pub fn validate(&self) -> Result<(u64, &str, &str), DownloadError> {
        let id = self
            .id
            .filter(|id| *id > 0)
            .ok_or_else(|| DownloadError::missing_field("id"))?;
        let image_url = self
            .image_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| DownloadError::missing_field("imageUrl"))?;
        let query = self
            .query
            .as_deref()
            .filter(|query| !query.is_empty())
            .ok_or_else(|| DownloadError::missing_field("query"))?;
        Ok((id, image_url, query))
    }
}

/// Saves search results to disk.
///
/// Designed to be created once and shared; the underlying `reqwest::Client`
/// pools connections across downloads.
#[derive(Debug, Clone)]
pub struct ImageDownloader {
    client: Client,
    extensions: ExtensionResolver,
    save_dir: PathBuf,
    timeout: Duration,
}

impl ImageDownloader {
    /// Creates a downloader saving under `save_dir`.
    ///
    /// A relative `save_dir` is resolved against the current directory so
    /// returned paths are absolute.
    #[must_use]
    pub fn new(client: Client, save_dir: impl Into<PathBuf>) -> Self {
        let save_dir = save_dir.into();
        let save_dir = std::path::absolute(&save_dir).unwrap_or(save_dir);
        Self {
            extensions: ExtensionResolver::new(client.clone()),
            client,
            save_dir,
            timeout: Duration::from_secs(DOWNLOAD_TIMEOUT_SECS),
        }
    }

    /// Overrides the timeout for the streamed request.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the extension resolver (e.g. to change its probe timeout).
    #[must_use]
    pub fn extension_resolver(mut self, extensions: ExtensionResolver) -> Self {
        self.extensions = extensions;
        self
    }

    /// Base directory that per-query folders are created under.
    #[must_use]
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Downloads the image named by `request` and returns its absolute path.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - A field is missing or the URL/query is unusable (nothing attempted)
    /// - The query folder cannot be created
    /// - The request fails (network error, timeout)
    /// - The server returns a non-2xx status (no file is created)
    /// - Writing to disk fails
    ///
    /// A failure after streaming started leaves the partial file on disk.
    #[instrument(skip(self, request), fields(id = ?request.id, url = ?request.image_url))]
    pub async fn download(&self, request: &DownloadRequest) -> Result<PathBuf, DownloadError> {
        let (id, image_url, query) = request.validate()?;

        let parsed = Url::parse(image_url).map_err(|_| DownloadError::invalid_url(image_url))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DownloadError::invalid_url(image_url));
        }

        let folder = ensure_query_folder(&self.save_dir, query).await?;
        let extension = self.extensions.resolve(image_url).await;
        let file_path = folder.join(target_file_name(id, &extension));

        info!(path = %file_path.display(), "downloading image");

        let response = self
            .client
            .get(parsed)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| DownloadError::network(image_url, e))?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "image request rejected");
            return Err(DownloadError::http_status(image_url, status.as_u16()));
        }

        let file = File::create(&file_path)
            .await
            .map_err(|e| DownloadError::io(file_path.clone(), e))?;
        let bytes = stream_to_file(file, response, image_url, &file_path).await?;

        info!(path = %file_path.display(), bytes, "download complete");
        Ok(file_path)
    }
}

/// Streams response body to file through an 8 KiB buffer, returning bytes written.
async fn stream_to_file(
    file: File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::with_capacity(DOWNLOAD_CHUNK_SIZE, file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = match chunk_result {
            Ok(chunk) => chunk,
            Err(e) => {
                // The partial file stays; make it hold everything received.
                if let Err(flush_error) = writer.flush().await {
                    warn!(path = %file_path.display(), error = %flush_error, "failed to flush partial file");
                }
                debug!(bytes_written, "body stream failed mid-download");
                return Err(DownloadError::network(url, e));
            }
        };

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
