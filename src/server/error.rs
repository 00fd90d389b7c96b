//! Mapping service failures onto HTTP responses.
//!
//! Every error body has the shape `{"error": ...}`. The value is the upstream
//! JSON error when the search API supplied one, otherwise a message string.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::{Value, json};

use crate::download::DownloadError;
use crate::search::SearchError;
use crate::service::{ServiceError, ValidationError};

/// A failed API call, ready to be rendered as a response.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl ApiError {
    /// 400 for caller mistakes, 500 for everything else.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Value placed under the `error` key.
    #[must_use]
    pub fn detail(&self) -> Value {
        match &self.0 {
            ServiceError::Search(error) => error
                .upstream_detail()
                .cloned()
                .unwrap_or_else(|| Value::String(error.to_string())),
            other => Value::String(other.to_string()),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        Self(error)
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self(ServiceError::Validation(error))
    }
}

impl From<SearchError> for ApiError {
    fn from(error: SearchError) -> Self {
        Self(ServiceError::Search(error))
    }
}

impl From<DownloadError> for ApiError {
    fn from(error: DownloadError) -> Self {
        Self(ServiceError::Download(error))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.detail() }))).into_response()
    }
}
