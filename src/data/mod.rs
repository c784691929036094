//! Core data types for the NFL props feed
//!
//! The feed is treated as opaque: a JSON array of player-projection records
//! that is passed through to clients without schema transformation.

pub mod feed;

pub use feed::FeedClient;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Default hard timeout for one upstream call, in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// A decoded feed: the sequence of player-projection records.
///
/// Cloning is cheap; the records are shared behind an `Arc` so that cache
/// snapshots never copy the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Records(Arc<Vec<Value>>);

impl Records {
    pub fn new(records: Vec<Value>) -> Self {
        Self(Arc::new(records))
    }

    /// Number of records in the feed
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    /// Serializes the records back to a JSON array body
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self.0.as_ref())
    }
}

impl Serialize for Records {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Outcome of a single upstream call
pub type FetchResult = Result<Records, FetchError>;

/// Errors that can occur when fetching the feed
#[derive(Debug, Error)]
pub enum FetchError {
    /// The upstream call exceeded the hard timeout
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// Connection failure or transport error
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Upstream answered with a non-success HTTP status
    #[error("upstream returned HTTP {0}")]
    Status(reqwest::StatusCode),

    /// Body was not a JSON array of records
    #[error("failed to decode feed: {0}")]
    Decode(#[from] serde_json::Error),

    /// Anything else, e.g. a request that could not be built
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Coarse failure classification used for logging and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchErrorKind {
    Timeout,
    NetworkError,
    DecodeError,
    Unexpected,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Timeout(_) => FetchErrorKind::Timeout,
            FetchError::Network(_) | FetchError::Status(_) => FetchErrorKind::NetworkError,
            FetchError::Decode(_) => FetchErrorKind::DecodeError,
            FetchError::Unexpected(_) => FetchErrorKind::Unexpected,
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FetchErrorKind::Timeout => "timeout",
            FetchErrorKind::NetworkError => "network-error",
            FetchErrorKind::DecodeError => "decode-error",
            FetchErrorKind::Unexpected => "unexpected",
        };
        f.write_str(label)
    }
}
