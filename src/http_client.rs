//! Shared HTTP client construction.
//!
//! One `reqwest::Client` serves the search client, the extension probe and the
//! downloader. Only the connect timeout is set here; each caller applies its
//! own per-request timeout (30 s search, 5 s probe, 30 s download).

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::{Client, ClientBuilder, Proxy};
use tracing::warn;

use crate::user_agent;

/// Default TCP connect timeout (10 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Builds the shared HTTP client.
///
/// Some sandboxed macOS environments panic while reading system proxy
/// settings; in that case the client is rebuilt from `HTTPS_PROXY` /
/// `HTTP_PROXY` / `ALL_PROXY` only.
///
/// # Errors
///
/// Returns the builder error when the client cannot be constructed, or a
/// synthetic builder error if both attempts panicked.
pub fn build_http_client(connect_timeout: Duration) -> Result<Client, reqwest::Error> {
    match try_build_client(connect_timeout, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Build(error)) => Err(error),
        Err(BuildClientFailure::Panic) => {
            warn!("HTTP client builder panicked while loading system proxy settings; retrying with env-proxy fallback");
            match try_build_client(connect_timeout, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Build(error)) => Err(error),
                Err(BuildClientFailure::Panic) => {
                    // Last resort: no proxy at all.
                    base_builder(connect_timeout).no_proxy().build()
                }
            }
        }
    }
}

/// Builds the shared HTTP client with the default connect timeout.
///
/// # Errors
///
/// See [`build_http_client`].
pub fn default_http_client() -> Result<Client, reqwest::Error> {
    build_http_client(Duration::from_secs(CONNECT_TIMEOUT_SECS))
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    connect_timeout: Duration,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(connect_timeout);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(connect_timeout: Duration) -> ClientBuilder {
    Client::builder()
        .connect_timeout(connect_timeout)
        .gzip(true)
        .user_agent(user_agent::default_user_agent())
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    let names: &[&str] = match scheme {
        "https" => &["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"],
        "http" => &["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"],
        _ => return None,
    };
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}
