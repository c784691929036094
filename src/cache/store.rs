//! Cache store holding the last good feed
//!
//! Provides a `CacheStore` that keeps the most recent successfully fetched
//! records together with their fetch timestamp and a running fetch counter.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::data::Records;

/// Default time-to-live for cached data in seconds
pub const DEFAULT_TTL_SECS: u64 = 3600;

/// Records from one successful fetch, stamped with when they were fetched
///
/// Data and timestamp live in one value so neither can exist without the
/// other.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedFeed {
    /// The cached records
    pub data: Records,
    /// When the records were fetched
    pub last_updated: DateTime<Utc>,
}

impl CachedFeed {
    /// Age of the data at `now`, in whole seconds. Clamped at zero.
    pub fn age_secs(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.last_updated)
            .num_seconds()
            .max(0) as u64
    }

    /// Whether the data is younger than `ttl` at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match now.signed_duration_since(self.last_updated).to_std() {
            Ok(age) => age < ttl,
            // last_updated is ahead of `now` (clock adjusted backwards)
            Err(_) => true,
        }
    }

    /// When the data stops being fresh
    pub fn expires_at(&self, ttl: Duration) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(ttl.as_secs()).ok()?;
        self.last_updated
            .checked_add_signed(chrono::Duration::seconds(secs))
    }
}

/// Point-in-time view of the cache
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheEntry {
    feed: Option<CachedFeed>,
    fetch_count: u64,
}

impl CacheEntry {
    /// The cached feed, absent until the first successful fetch
    pub fn feed(&self) -> Option<&CachedFeed> {
        self.feed.as_ref()
    }

    pub fn data(&self) -> Option<&Records> {
        self.feed.as_ref().map(|f| &f.data)
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.feed.as_ref().map(|f| f.last_updated)
    }

    /// Number of successful fetches since process start
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count
    }

    /// Number of cached records, zero when empty
    pub fn record_count(&self) -> usize {
        self.data().map(Records::len).unwrap_or(0)
    }

    /// True iff data is present and younger than `ttl` at `now`
    pub fn is_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.feed
            .as_ref()
            .is_some_and(|feed| feed.is_fresh(now, ttl))
    }
}

/// Shared in-memory cache for the projections feed
///
/// All access goes through an internal lock, so a reader always observes
/// either the previous entry or the new one, never a mix of the two.
#[derive(Debug)]
pub struct CacheStore {
    entry: RwLock<CacheEntry>,
    ttl: Duration,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TTL_SECS))
    }
}

impl CacheStore {
    /// Creates an empty store with the given TTL
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(CacheEntry::default()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns true iff data is present and `now - last_updated < ttl`
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.read_entry(|entry| entry.is_valid(now, self.ttl))
    }

    /// Replaces the cached records and timestamp, and bumps the fetch count
    ///
    /// # Returns
    /// The fetch count after this update
    pub fn update(&self, data: Records, now: DateTime<Utc>) -> u64 {
        // The entry is only ever replaced whole, so a poisoned lock still
        // guards a consistent value.
        let mut entry = self.entry.write().unwrap_or_else(PoisonError::into_inner);
        entry.feed = Some(CachedFeed {
            data,
            last_updated: now,
        });
        entry.fetch_count += 1;
        entry.fetch_count
    }

    /// Returns a consistent copy of the current entry
    pub fn snapshot(&self) -> CacheEntry {
        self.read_entry(CacheEntry::clone)
    }

    fn read_entry<R>(&self, f: impl FnOnce(&CacheEntry) -> R) -> R {
        let entry = self.entry.read().unwrap_or_else(PoisonError::into_inner);
        f(&entry)
    }
}
