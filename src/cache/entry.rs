//! Cache entry snapshots handed out to readers.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::FetchError;

/// Fetch status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// Not fetched yet, or invalidated and waiting for a re-fetch
  Idle,
  /// A fetch for the current epoch is in flight
  Loading,
  /// The last fetch for the current epoch succeeded
  Success,
  /// The last fetch for the current epoch failed
  Error,
}

impl QueryStatus {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryStatus::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryStatus::Success)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryStatus::Error)
  }
}

/// Immutable snapshot of the cached state for one key.
///
/// `data` survives loading, errors and invalidation so readers can keep
/// showing the last known result while a re-fetch is pending.
#[derive(Debug, PartialEq)]
pub struct CacheEntry<K, V> {
  pub key: K,
  pub status: QueryStatus,
  pub data: Option<Arc<V>>,
  pub error: Option<FetchError>,
  /// Epoch of the most recently dispatched fetch; 0 before the first one.
  /// Drawn from a store-wide counter, so it never repeats for a key even
  /// after the entry is evicted and recreated.
  pub epoch: u64,
  /// Set by invalidation, cleared by the next successful fetch
  pub invalidated: bool,
  /// When `data` was last replaced
  pub updated_at: Option<DateTime<Utc>>,
}

// Not derived: `data` is shared through `Arc`, so `V` need not be `Clone`.
impl<K: Clone, V> Clone for CacheEntry<K, V> {
  fn clone(&self) -> Self {
    Self {
      key: self.key.clone(),
      status: self.status,
      data: self.data.clone(),
      error: self.error.clone(),
      epoch: self.epoch,
      invalidated: self.invalidated,
      updated_at: self.updated_at,
    }
  }
}

impl<K, V> CacheEntry<K, V> {
  pub fn idle(key: K) -> Self {
    Self {
      key,
      status: QueryStatus::Idle,
      data: None,
      error: None,
      epoch: 0,
      invalidated: false,
      updated_at: None,
    }
  }

  pub fn data(&self) -> Option<&V> {
    self.data.as_deref()
  }

  pub fn is_loading(&self) -> bool {
    self.status.is_loading()
  }

  /// Success and not invalidated since: a read can be served from cache.
  pub fn is_fresh(&self) -> bool {
    self.status.is_success() && !self.invalidated
  }
}
