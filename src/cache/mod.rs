//! Generic in-memory query cache.
//!
//! This module knows nothing about the network or the board domain:
//! - Query keys identify cacheable reads and group into resource kinds
//! - The store keeps one entry per key with status, data and error
//! - Writes are guarded by a per-key epoch so stale responses are dropped
//! - Invalidation marks entries stale by exact key or by resource kind

mod entry;
mod storage;
mod traits;

pub use entry::{CacheEntry, QueryStatus};
pub use storage::CacheStore;
pub use traits::{KeyPattern, QueryKey};

#[cfg(test)]
pub(crate) use traits::test_keys;
