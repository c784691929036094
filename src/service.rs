//! Refresh-and-read logic shared by the scheduler and the HTTP handlers
//!
//! [`PropsService`] owns the feed client and a handle to the shared
//! [`CacheStore`]. Scheduled refreshes always fetch; request-time refreshes
//! only fetch when the cache is stale. Concurrent stale requests share a
//! single upstream call, and its outcome, whether it succeeded or failed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::{CacheStore, CachedFeed};
use crate::data::{FeedClient, FetchError, FetchErrorKind};

/// The cache has never been populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Unable to retrieve NFL props data. Please try again later.")]
pub struct NoDataError;

/// What a request-time refresh check ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Cache was valid; no upstream call was made by this caller
    Fresh,
    /// This caller fetched and stored new data
    Refreshed { fetch_count: u64 },
    /// The fetch failed; the cache is unchanged
    Failed(FetchErrorKind),
}

/// Result of the most recent upstream call, guarded by the refresh lock
#[derive(Debug, Default)]
struct LastAttempt {
    failure: Option<FetchErrorKind>,
}

/// Fetches the feed into the shared cache and serves reads from it
#[derive(Debug)]
pub struct PropsService {
    client: FeedClient,
    store: Arc<CacheStore>,
    /// Held for the duration of any upstream call
    refresh_lock: Mutex<LastAttempt>,
    /// Number of completed upstream calls, successful or not
    attempts: AtomicU64,
}

impl PropsService {
    pub fn new(client: FeedClient, store: Arc<CacheStore>) -> Self {
        Self {
            client,
            store,
            refresh_lock: Mutex::new(LastAttempt::default()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Fetches unconditionally and stores the result on success
    ///
    /// # Returns
    /// * `Ok(fetch_count)` - The fetch count after the update
    /// * `Err(FetchError)` - The fetch failed; the cache was left untouched
    pub async fn refresh(&self) -> Result<u64, FetchError> {
        let mut last = self.refresh_lock.lock().await;
        self.attempt(&mut last).await
    }

    /// Refreshes only when the cache is stale or empty
    ///
    /// Callers arriving while another refresh is in flight wait for it and
    /// take its outcome instead of issuing a second upstream call, so a
    /// failing upstream costs every waiter at most one timeout.
    pub async fn refresh_if_stale(&self) -> RefreshOutcome {
        if self.store.is_valid(Utc::now()) {
            return RefreshOutcome::Fresh;
        }

        let seen = self.attempts.load(Ordering::Acquire);
        let mut last = self.refresh_lock.lock().await;
        if self.store.is_valid(Utc::now()) {
            return RefreshOutcome::Fresh;
        }
        if self.attempts.load(Ordering::Acquire) != seen {
            // An attempt completed while this caller waited
            return match last.failure {
                Some(kind) => RefreshOutcome::Failed(kind),
                None => RefreshOutcome::Fresh,
            };
        }

        info!("cache expired or empty, fetching fresh data");
        match self.attempt(&mut last).await {
            Ok(fetch_count) => RefreshOutcome::Refreshed { fetch_count },
            Err(e) => RefreshOutcome::Failed(e.kind()),
        }
    }

    /// Returns the cached feed, refreshing first if it is stale
    ///
    /// A failed refresh falls back to whatever is cached, however old.
    ///
    /// # Returns
    /// * `Ok(CachedFeed)` - The freshest data available
    /// * `Err(NoDataError)` - No fetch has ever succeeded
    pub async fn read(&self) -> Result<CachedFeed, NoDataError> {
        if let RefreshOutcome::Failed(kind) = self.refresh_if_stale().await {
            warn!(%kind, "on-demand refresh failed, serving cached data if any");
        }

        self.store.snapshot().feed().cloned().ok_or(NoDataError)
    }

    /// Runs one upstream call while the refresh lock is held
    async fn attempt(&self, last: &mut LastAttempt) -> Result<u64, FetchError> {
        let result = self.fetch_and_store().await;
        last.failure = result.as_ref().err().map(FetchError::kind);
        self.attempts.fetch_add(1, Ordering::Release);
        result
    }

    async fn fetch_and_store(&self) -> Result<u64, FetchError> {
        match self.client.fetch().await {
            Ok(records) => {
                let count = records.len();
                let fetch_count = self.store.update(records, Utc::now());
                info!(records = count, fetch_count, "feed refreshed");
                Ok(fetch_count)
            }
            Err(e) => {
                warn!(kind = %e.kind(), error = %e, "feed fetch failed");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Records;
    use reqwest::Url;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TTL: Duration = Duration::from_secs(3600);

    fn service_for(server: &MockServer) -> PropsService {
        let url = Url::parse(&format!("{}/feed", server.uri())).unwrap();
        PropsService::new(FeedClient::new(url), Arc::new(CacheStore::new(TTL)))
    }

    async fn mount_ok(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_refresh_updates_store() {
        let server = MockServer::start().await;
        mount_ok(&server, json!([{"PLAYER": "A"}, {"PLAYER": "B"}])).await;
        let service = service_for(&server);

        assert_eq!(service.refresh().await.unwrap(), 1);
        assert_eq!(service.refresh().await.unwrap(), 2);

        let snapshot = service.store().snapshot();
        assert_eq!(snapshot.record_count(), 2);
        assert_eq!(snapshot.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_store_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let service = service_for(&server);
        let earlier = Utc::now() - chrono::Duration::minutes(61);
        service.store().update(Records::new(vec![json!({"old": true})]), earlier);

        let err = service.refresh().await.unwrap_err();
        assert_eq!(err.kind(), FetchErrorKind::NetworkError);

        let snapshot = service.store().snapshot();
        assert_eq!(snapshot.fetch_count(), 1);
        assert_eq!(snapshot.last_updated(), Some(earlier));
    }

    #[tokio::test]
    async fn test_refresh_if_stale_skips_valid_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(0)
            .mount(&server)
            .await;
        let service = service_for(&server);
        service.store().update(Records::new(vec![]), Utc::now());

        assert_eq!(service.refresh_if_stale().await, RefreshOutcome::Fresh);
    }

    #[tokio::test]
    async fn test_refresh_if_stale_fetches_empty_cache() {
        let server = MockServer::start().await;
        mount_ok(&server, json!([{"PLAYER": "A"}])).await;
        let service = service_for(&server);

        assert_eq!(
            service.refresh_if_stale().await,
            RefreshOutcome::Refreshed { fetch_count: 1 }
        );
    }

    #[tokio::test]
    async fn test_read_without_data_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;
        let service = service_for(&server);

        assert_eq!(service.read().await.unwrap_err(), NoDataError);
        assert_eq!(service.store().snapshot().fetch_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_stale_reads_share_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"PLAYER": "A"}]))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let service = Arc::new(service_for(&server));

        let reads = (0..8).map(|_| {
            let service = Arc::clone(&service);
            async move { service.read().await }
        });
        let results = futures::future::join_all(reads).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(service.store().snapshot().fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_stale_reads_share_one_failed_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"PLAYER": "new"}]))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let url = Url::parse(&format!("{}/feed", server.uri())).unwrap();
        let client = FeedClient::new(url).with_timeout(Duration::from_millis(300));
        let service = Arc::new(PropsService::new(client, Arc::new(CacheStore::new(TTL))));
        let earlier = Utc::now() - chrono::Duration::minutes(61);
        service
            .store()
            .update(Records::new(vec![json!({"PLAYER": "old"})]), earlier);

        let started = std::time::Instant::now();
        let reads = (0..5).map(|_| {
            let service = Arc::clone(&service);
            async move { service.read().await }
        });
        let results = futures::future::join_all(reads).await;
        let elapsed = started.elapsed();

        for result in &results {
            let feed = result.as_ref().expect("stale data should be served");
            assert_eq!(feed.last_updated, earlier);
        }
        let calls = server.received_requests().await.unwrap().len();
        assert_eq!(calls, 1, "waiters must not retry a failed fetch");
        assert!(elapsed < Duration::from_secs(1), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_refresh_after_shared_failure_fetches_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_ok(&server, json!([{"PLAYER": "A"}])).await;
        let service = service_for(&server);

        assert_eq!(
            service.refresh_if_stale().await,
            RefreshOutcome::Failed(FetchErrorKind::NetworkError)
        );
        assert_eq!(
            service.refresh_if_stale().await,
            RefreshOutcome::Refreshed { fetch_count: 1 }
        );
    }
}
