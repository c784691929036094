//! Upstream feed client
//!
//! Performs one GET against the configured projections endpoint and decodes
//! the body into [`Records`]. Every failure is classified into a
//! [`FetchError`]; nothing is retried.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use super::{FetchError, FetchResult, Records, DEFAULT_FETCH_TIMEOUT_SECS};

/// Client for fetching the projections feed
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl FeedClient {
    /// Creates a new FeedClient with the default 30 second timeout
    pub fn new(url: Url) -> Self {
        Self {
            client: Client::new(),
            url,
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    /// Overrides the hard timeout applied to each call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Host of the upstream endpoint.
    ///
    /// The full URL carries the API key in its query string and must not be
    /// logged.
    pub fn upstream_host(&self) -> &str {
        self.url.host_str().unwrap_or("<unknown>")
    }

    /// Fetches and decodes the feed
    ///
    /// # Returns
    /// * `Ok(Records)` - The decoded sequence of records
    /// * `Err(FetchError)` - Timeout, transport failure, non-success status,
    ///   undecodable body, or an unexpected request error
    pub async fn fetch(&self) -> FetchResult {
        debug!(host = self.upstream_host(), "fetching projections feed");

        let response = self
            .client
            .get(self.url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let text = response.text().await.map_err(|e| self.classify(e))?;
        let records: Vec<Value> = serde_json::from_str(&text)?;

        Ok(Records::new(records))
    }

    /// Maps a transport-level error onto the fetch taxonomy
    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout.as_secs())
        } else if err.is_builder() {
            FetchError::Unexpected(err.to_string())
        } else {
            FetchError::Network(err)
        }
    }
}
