//! HTTP surface
//!
//! Routes:
//! - `GET /api/props` - the cached feed, refreshed on demand when stale
//! - `GET /api/status` - cache freshness and fetch statistics
//! - `GET /health` - liveness, independent of cache state
//!
//! CORS preflight for every route is answered by the CORS layer.

pub mod error;
pub mod props;
pub mod status;

use std::future::Future;
use std::sync::Arc;

use axum::http::{header, HeaderName, Method};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::refresh::SchedulerState;
use crate::service::PropsService;

pub use error::ApiError;

/// Custom header carrying the cache age in seconds
pub const X_CACHE_AGE: &str = "x-cache-age";
/// Custom header carrying the number of records served
pub const X_RECORD_COUNT: &str = "x-record-count";

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PropsService>,
    pub scheduler: watch::Receiver<SchedulerState>,
}

impl AppState {
    pub fn new(service: Arc<PropsService>, scheduler: watch::Receiver<SchedulerState>) -> Self {
        Self { service, scheduler }
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        *self.scheduler.borrow()
    }
}

/// Builds the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/props", get(props::get_props))
        .route("/api/status", get(status::get_status))
        .route("/health", get(status::health))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin may read the feed.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([
            HeaderName::from_static(X_CACHE_AGE),
            HeaderName::from_static(X_RECORD_COUNT),
        ])
}

/// Serves the router on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
