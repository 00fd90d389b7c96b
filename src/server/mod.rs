//! HTTP routes for the image search proxy.
//!
//! All routes live under `/api`:
//!
//! | Method | Path            | Body / query                     | Success                        |
//! |--------|-----------------|----------------------------------|--------------------------------|
//! | GET    | `/api/keywords` |                                  | `["term", ...]`                |
//! | GET    | `/api/search`   | `q`, `apiKey`, `cx`, `total`     | `[ResultItem, ...]`            |
//! | POST   | `/api/download` | `{"id","imageUrl","query"}`      | `{"status":"success","path"}`  |
//!
//! Failures are rendered by [`ApiError`].

mod error;

use std::future::Future;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::routing::{get, post};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::download::DownloadRequest;
use crate::search::ResultItem;
use crate::service::{ImageSearchService, SearchParams, ValidationError};

pub use error::ApiError;

/// Body returned by a successful download.
#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub status: &'static str,
    pub path: String,
}

/// Builds the `/api` router over a shared service.
pub fn router(service: Arc<ImageSearchService>) -> Router {
    let api = Router::new()
        .route("/keywords", get(keywords))
        .route("/search", get(search))
        .route("/download", post(download));

    Router::new().nest("/api", api).with_state(service)
}

/// Serves the API on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns the IO error if accepting connections fails.
pub async fn serve<F>(
    listener: TcpListener,
    service: Arc<ImageSearchService>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, save_dir = %service.save_dir().display(), "listening");
    }
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn keywords(
    State(service): State<Arc<ImageSearchService>>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(service.keywords().await?))
}

async fn search(
    State(service): State<Arc<ImageSearchService>>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<ResultItem>>, ApiError> {
    // Parsed by hand so repeated keys keep their first value instead of failing.
    let params = SearchParams::from_query_string(query.as_deref());
    Ok(Json(service.search(&params).await?))
}

async fn download(
    State(service): State<Arc<ImageSearchService>>,
    body: Bytes,
) -> Result<Json<DownloadResponse>, ApiError> {
    // Parsed by hand so a bad body still gets the `{"error"}` shape.
    let request: DownloadRequest = serde_json::from_slice(&body).map_err(|e| {
        debug!(error = %e, "malformed download body");
        ValidationError::MalformedBody(e.to_string())
    })?;

    let path = service.download(&request).await?;
    Ok(Json(DownloadResponse {
        status: "success",
        path: path.display().to_string(),
    }))
}
