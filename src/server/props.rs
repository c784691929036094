//! `GET /api/props`

use axum::extract::State;
use axum::http::{header, HeaderName};
use axum::response::{IntoResponse, Response};
use chrono::Utc;

use super::{ApiError, AppState, X_CACHE_AGE, X_RECORD_COUNT};

/// Returns the cached feed verbatim, refreshing it first if it is stale
///
/// Responds 500 only when no fetch has ever succeeded. A failed refresh of
/// stale data still serves the stale data.
pub async fn get_props(State(state): State<AppState>) -> Result<Response, ApiError> {
    let feed = state.service.read().await?;
    let body = feed.data.to_json_bytes()?;

    let age = feed.age_secs(Utc::now());
    let max_age = state.service.store().ttl().as_secs();

    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (header::CACHE_CONTROL, format!("public, max-age={}", max_age)),
        (HeaderName::from_static(X_CACHE_AGE), age.to_string()),
        (HeaderName::from_static(X_RECORD_COUNT), feed.data.len().to_string()),
    ];

    Ok((headers, body).into_response())
}
