//! Constants for the download module (timeouts, buffering, storage).

/// Timeout for the streamed image request (30 seconds).
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Timeout for the `HEAD` probe used to infer a file extension (5 seconds).
pub const PROBE_TIMEOUT_SECS: u64 = 5;

/// Write buffer size while streaming a response body to disk (8 KiB).
pub const DOWNLOAD_CHUNK_SIZE: usize = 8 * 1024;

/// Default directory (relative to the working directory) for saved images.
pub const DEFAULT_SAVE_DIR: &str = "downloaded_images";
