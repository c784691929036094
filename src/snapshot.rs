//! One-shot export of the feed to a JSON file
//!
//! Fetches the feed once and writes it as pretty-printed JSON, skipping the
//! upstream call when the existing file is still younger than the TTL. The
//! server never reads this file back.

use std::path::Path;
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::info;

use crate::data::{FeedClient, FetchError};

/// Errors that can occur while exporting the feed
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Upstream fetch failed
    #[error("Failed to update data: {0}")]
    Fetch(#[from] FetchError),

    /// The records could not be serialized
    #[error("Failed to encode feed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Reading file metadata or writing the file failed
    #[error("Failed to write output file: {0}")]
    Io(#[from] std::io::Error),
}

/// What the export did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The file was recent enough; nothing was fetched
    Skipped { age: Duration },
    /// The feed was fetched and written
    Written { records: usize },
}

/// Age of the file at `path`, or `None` if it does not exist
async fn file_age(path: &Path, now: SystemTime) -> std::io::Result<Option<Duration>> {
    match tokio::fs::metadata(path).await {
        Ok(meta) => {
            let modified = meta.modified()?;
            Ok(Some(now.duration_since(modified).unwrap_or_default()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Returns the age of the file if it is still fresh, `None` if it needs an update
pub async fn fresh_age(path: &Path, ttl: Duration) -> std::io::Result<Option<Duration>> {
    Ok(file_age(path, SystemTime::now())
        .await?
        .filter(|age| *age < ttl))
}

/// Fetches the feed and writes it to `output`
///
/// # Arguments
/// * `client` - Upstream feed client
/// * `output` - Destination file
/// * `ttl` - Minimum age of an existing file before it is refetched
/// * `force` - Fetch regardless of the file's age
pub async fn export(
    client: &FeedClient,
    output: &Path,
    ttl: Duration,
    force: bool,
) -> Result<SnapshotOutcome, SnapshotError> {
    if !force {
        if let Some(age) = fresh_age(output, ttl).await? {
            info!(
                path = %output.display(),
                age_secs = age.as_secs(),
                "output file is recent, no update needed"
            );
            return Ok(SnapshotOutcome::Skipped { age });
        }
    }

    let records = client.fetch().await?;
    let json = serde_json::to_string_pretty(&records)?;
    tokio::fs::write(output, json).await?;

    info!(path = %output.display(), records = records.len(), "feed written");
    Ok(SnapshotOutcome::Written {
        records: records.len(),
    })
}
