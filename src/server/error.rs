//! Error responses for the HTTP surface

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::service::NoDataError;

/// Errors a handler can return
#[derive(Debug, Error)]
pub enum ApiError {
    /// No fetch has succeeded since startup
    #[error(transparent)]
    NoData(#[from] NoDataError),

    /// The cached records could not be serialized
    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// JSON body sent with every error response
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    timestamp: DateTime<Utc>,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn label(&self) -> &'static str {
        match self {
            ApiError::NoData(_) => "Failed to fetch data",
            ApiError::Encode(_) => "Internal error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Encode(ref e) = self {
            error!(error = %e, "failed to encode cached feed");
        }

        let body = ErrorBody {
            error: self.label(),
            message: self.to_string(),
            timestamp: Utc::now(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
