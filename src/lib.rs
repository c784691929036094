//! NFL props API library
//!
//! Fetches an NFL player-projection feed, caches it in memory with a TTL, and
//! serves it over HTTP. The binary wires these modules together; they are
//! exposed here for integration tests.

pub mod cache;
pub mod cli;
pub mod data;
pub mod logging;
pub mod refresh;
pub mod server;
pub mod service;
pub mod snapshot;
