//! On-disk layout for saved images: `<base>/<sanitized query>/<id><ext>`.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::DownloadError;

/// Turns a query into a folder name.
///
/// Alphanumeric characters, spaces, `-` and `_` are kept; everything else
/// becomes `_`. Surrounding whitespace is trimmed afterwards.
#[must_use]
pub fn sanitize_query_folder(query: &str) -> String {
    let mapped: String = query
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    mapped.trim().to_string()
}

/// Returns the folder for `query` under `base_dir` without touching the disk.
///
/// # Errors
///
/// Returns [`DownloadError::InvalidQuery`] when sanitization leaves nothing.
pub fn query_folder(base_dir: &Path, query: &str) -> Result<PathBuf, DownloadError> {
    let folder = sanitize_query_folder(query);
    if folder.is_empty() {
        return Err(DownloadError::invalid_query(query));
    }
    Ok(base_dir.join(folder))
}

/// Creates the folder for `query` under `base_dir` if it does not exist.
///
/// # Errors
///
/// Returns [`DownloadError::InvalidQuery`] for unusable queries and
/// [`DownloadError::Io`] when the directory cannot be created.
pub async fn ensure_query_folder(base_dir: &Path, query: &str) -> Result<PathBuf, DownloadError> {
    let folder = query_folder(base_dir, query)?;
    tokio::fs::create_dir_all(&folder)
        .await
        .map_err(|e| DownloadError::io(folder.clone(), e))?;
    debug!(folder = %folder.display(), "query folder ready");
    Ok(folder)
}

/// File name for a result: `<id><ext>`.
#[must_use]
pub fn target_file_name(id: u64, extension: &str) -> String {
    format!("{id}{extension}")
}
