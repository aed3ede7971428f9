//! Per-caller query handle that follows a changing key.
//!
//! A caller such as a live search box re-issues its query with new
//! parameters faster than responses come back. The observer only ever
//! surfaces the entry of the key it currently points at; responses for keys
//! it has moved away from still land in their own entries but never reach
//! this caller.
//!
//! # Example
//!
//! ```ignore
//! let mut observer = QueryObserver::new(client.clone(), key, true, move |key| {
//!     let api = api.clone();
//!     let key = key.clone();
//!     async move { api.load(&key).await }
//! });
//!
//! // User typed another character
//! observer.set_key(next_key);
//!
//! // In render
//! let entry = observer.state();
//! ```

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

use super::client::{Fetcher, QueryClient};
use crate::cache::{CacheEntry, QueryKey};
use crate::error::{ApiError, FetchError};

type KeyedFetcher<K, V> = Arc<dyn Fn(&K) -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync>;

pub struct QueryObserver<K: QueryKey, V> {
  client: QueryClient<K, V>,
  fetch: KeyedFetcher<K, V>,
  key: K,
  enabled: bool,
  receiver: watch::Receiver<CacheEntry<K, V>>,
}

impl<K: QueryKey, V: Send + Sync + 'static> QueryObserver<K, V> {
  /// Start observing `key`, fetching it right away when `enabled`.
  pub fn new<F, Fut>(client: QueryClient<K, V>, key: K, enabled: bool, fetch: F) -> Self
  where
    F: Fn(&K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
  {
    let receiver = client.subscribe(&key);
    let observer = Self {
      client,
      fetch: Arc::new(move |key: &K| fetch(key).boxed()),
      key,
      enabled,
      receiver,
    };
    observer.ensure();
    observer
  }

  pub fn key(&self) -> &K {
    &self.key
  }

  /// Point the observer at a new key.
  ///
  /// The subscription to the previous key is dropped, so its late responses
  /// are never surfaced here.
  pub fn set_key(&mut self, key: K) -> CacheEntry<K, V> {
    if key != self.key {
      self.receiver = self.client.subscribe(&key);
      self.key = key;
    }
    self.ensure()
  }

  /// Gate fetching, e.g. until a prerequisite id is resolved.
  pub fn set_enabled(&mut self, enabled: bool) -> CacheEntry<K, V> {
    self.enabled = enabled;
    self.ensure()
  }

  /// Snapshot of the current key's entry.
  pub fn state(&self) -> CacheEntry<K, V> {
    self.receiver.borrow().clone()
  }

  pub fn data(&self) -> Option<Arc<V>> {
    self.receiver.borrow().data.clone()
  }

  pub fn is_loading(&self) -> bool {
    self.receiver.borrow().is_loading()
  }

  pub fn error(&self) -> Option<FetchError> {
    self.receiver.borrow().error.clone()
  }

  /// Force a new fetch of the current key (user-triggered refresh).
  pub fn refetch(&self) -> CacheEntry<K, V> {
    if !self.enabled {
      return self.state();
    }
    self.client.refetch_with(self.key.clone(), self.fetcher())
  }

  /// Wait for the next snapshot of the current key.
  pub async fn changed(&mut self) -> CacheEntry<K, V> {
    // Sender gone means the entry was evicted; follow its replacement
    if self.receiver.changed().await.is_err() {
      self.receiver = self.client.subscribe(&self.key);
    }
    self.state()
  }

  /// Wait until the current key is no longer loading.
  pub async fn settled(&mut self) -> CacheEntry<K, V> {
    let settled = self
      .receiver
      .wait_for(|entry| !entry.is_loading())
      .await
      .map(|entry| (*entry).clone());
    match settled {
      Ok(entry) => entry,
      Err(_) => {
        self.receiver = self.client.subscribe(&self.key);
        self.state()
      }
    }
  }

  fn fetcher(&self) -> Fetcher<V> {
    let fetch = Arc::clone(&self.fetch);
    let key = self.key.clone();
    Arc::new(move || fetch(&key))
  }

  fn ensure(&self) -> CacheEntry<K, V> {
    self
      .client
      .ensure_fresh_with(self.key.clone(), self.fetcher(), self.enabled)
  }
}

impl<K: QueryKey, V: std::fmt::Debug> std::fmt::Debug for QueryObserver<K, V> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryObserver")
      .field("key", &self.key)
      .field("enabled", &self.enabled)
      .field("state", &*self.receiver.borrow())
      .finish_non_exhaustive()
  }
}
