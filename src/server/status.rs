//! `GET /api/status` and `GET /health`
//!
//! Both are read-only: the status report is derived from a cache snapshot
//! and never triggers a fetch.

use std::time::Duration;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::AppState;
use crate::cache::CacheEntry;
use crate::refresh::SchedulerState;

/// Endpoints listed in the status report
pub const ENDPOINTS: [&str; 3] = ["/api/props", "/api/status", "/health"];

/// Status report, shaped by whether the cache has ever been populated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatusResponse {
    Healthy(HealthyStatus),
    Starting(StartingStatus),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthyStatus {
    pub status: &'static str,
    pub server_time: DateTime<Utc>,
    pub cache: CacheStatus,
    pub data: DataStatus,
    pub scheduler: SchedulerState,
    pub api: ApiInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub is_valid: bool,
    pub last_updated: DateTime<Utc>,
    pub age_seconds: u64,
    pub age_minutes: f64,
    pub next_update_in_seconds: u64,
    pub next_update_in_minutes: f64,
    /// Wall-clock time of the next expiry, e.g. `05:30 PM`
    pub next_update_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataStatus {
    pub records: usize,
    pub total_fetches: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiInfo {
    pub version: &'static str,
    pub endpoints: [&'static str; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartingStatus {
    pub status: &'static str,
    pub message: &'static str,
    pub cache: StartingCache,
    pub scheduler: SchedulerState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartingCache {
    pub is_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// Builds the status report for `entry` as seen at `now`
pub fn build_status(
    entry: &CacheEntry,
    ttl: Duration,
    now: DateTime<Utc>,
    scheduler: SchedulerState,
) -> StatusResponse {
    let Some(feed) = entry.feed() else {
        return StatusResponse::Starting(StartingStatus {
            status: "starting",
            message: "Server is initializing, waiting for first data fetch",
            cache: StartingCache { is_valid: false },
            scheduler,
        });
    };

    let age_seconds = feed.age_secs(now);
    let next_update = feed.expires_at(ttl);
    let next_update_in_seconds = next_update
        .map(|at| at.signed_duration_since(now).num_seconds().max(0) as u64)
        .unwrap_or(u64::MAX);

    StatusResponse::Healthy(HealthyStatus {
        status: "healthy",
        server_time: now,
        cache: CacheStatus {
            is_valid: entry.is_valid(now, ttl),
            last_updated: feed.last_updated,
            age_seconds,
            age_minutes: minutes(age_seconds),
            next_update_in_seconds,
            next_update_in_minutes: minutes(next_update_in_seconds),
            next_update_at: next_update
                .map(|at| at.format("%I:%M %p").to_string())
                .unwrap_or_default(),
        },
        data: DataStatus {
            records: entry.record_count(),
            total_fetches: entry.fetch_count(),
        },
        scheduler,
        api: ApiInfo {
            version: env!("CARGO_PKG_VERSION"),
            endpoints: ENDPOINTS,
        },
    })
}

/// Seconds to minutes, rounded to one decimal place
fn minutes(secs: u64) -> f64 {
    (secs as f64 / 6.0).round() / 10.0
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let store = state.service.store();
    let entry = store.snapshot();
    Json(build_status(
        &entry,
        store.ttl(),
        Utc::now(),
        state.scheduler_state(),
    ))
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::data::Records;
    use chrono::TimeZone;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(3600);

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 7, 16, 0, 0).unwrap()
    }

    fn populated(at: DateTime<Utc>, n: usize) -> CacheEntry {
        let store = CacheStore::new(TTL);
        store.update(Records::new((0..n).map(|i| json!({ "id": i })).collect()), at);
        store.snapshot()
    }

    #[test]
    fn test_starting_status_before_first_fetch() {
        let status = build_status(&CacheEntry::default(), TTL, t0(), SchedulerState::Fetching);
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["status"], "starting");
        assert_eq!(json["cache"]["is_valid"], false);
        assert_eq!(json["scheduler"], "fetching");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_healthy_status_for_fresh_cache() {
        let entry = populated(t0(), 32);
        let now = t0() + chrono::Duration::seconds(1800);
        let status = build_status(&entry, TTL, now, SchedulerState::Sleeping);

        let StatusResponse::Healthy(status) = status else {
            panic!("expected healthy status");
        };
        assert!(status.cache.is_valid);
        assert_eq!(status.cache.last_updated, t0());
        assert_eq!(status.cache.age_seconds, 1800);
        assert_eq!(status.cache.age_minutes, 30.0);
        assert_eq!(status.cache.next_update_in_seconds, 1800);
        assert_eq!(status.cache.next_update_in_minutes, 30.0);
        assert_eq!(status.cache.next_update_at, "05:00 PM");
        assert_eq!(status.data.records, 32);
        assert_eq!(status.data.total_fetches, 1);
        assert_eq!(status.scheduler, SchedulerState::Sleeping);
        assert_eq!(status.api.endpoints, ENDPOINTS);
    }

    #[test]
    fn test_expired_cache_reports_invalid_with_zero_countdown() {
        let entry = populated(t0(), 3);
        let now = t0() + chrono::Duration::minutes(61);
        let json = serde_json::to_value(build_status(&entry, TTL, now, SchedulerState::Sleeping))
            .unwrap();

        assert_eq!(json["status"], "healthy");
        assert_eq!(json["cache"]["is_valid"], false);
        assert_eq!(json["cache"]["age_seconds"], 3660);
        assert_eq!(json["cache"]["next_update_in_seconds"], 0);
        assert_eq!(json["data"]["records"], 3);
    }

    #[test]
    fn test_minutes_rounds_to_one_decimal() {
        assert_eq!(minutes(0), 0.0);
        assert_eq!(minutes(90), 1.5);
        assert_eq!(minutes(100), 1.7);
        assert_eq!(minutes(3600), 60.0);
    }

    #[tokio::test]
    async fn test_health_payload() {
        let Json(body) = health().await;
        assert_eq!(body.status, "ok");
        assert!(body.timestamp <= Utc::now());
    }
}
