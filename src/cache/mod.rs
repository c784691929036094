//! In-memory cache for the projections feed
//!
//! This module provides the [`CacheStore`], the single piece of shared
//! mutable state in the service. Entries are replaced whole; invalidation is
//! purely TTL-based. Stale entries stay readable so that callers can degrade
//! to the last good feed when the upstream API is unavailable.

mod store;

pub use store::{CacheEntry, CacheStore, CachedFeed, DEFAULT_TTL_SECS};
