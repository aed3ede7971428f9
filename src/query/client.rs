//! Query coordinator: binds query keys to fetchers and keeps entries correct
//! under concurrent and superseding requests.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CacheEntry, CacheStore, KeyPattern, QueryKey};
use crate::error::{ApiError, FetchError};

/// A factory producing one fetch future per call.
pub type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V, ApiError>> + Send + Sync>;

struct Inner<K: QueryKey, V> {
  store: CacheStore<K, V>,
  /// Last fetcher registered for each key, used for re-fetches
  fetchers: HashMap<K, Fetcher<V>>,
}

fn lock<K: QueryKey, V>(inner: &Mutex<Inner<K, V>>) -> MutexGuard<'_, Inner<K, V>> {
  // Every store step completes before the guard drops, so a poisoned lock
  // still guards a consistent store.
  inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the cache store and dispatches fetches into it.
///
/// Cloning is cheap and every clone shares the same store. Independent
/// instances never share state.
pub struct QueryClient<K: QueryKey, V> {
  inner: Arc<Mutex<Inner<K, V>>>,
}

impl<K: QueryKey, V> Clone for QueryClient<K, V> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<K: QueryKey, V: Send + Sync + 'static> Default for QueryClient<K, V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<K: QueryKey, V: Send + Sync + 'static> QueryClient<K, V> {
  pub fn new() -> Self {
    Self {
      inner: Arc::new(Mutex::new(Inner {
        store: CacheStore::new(),
        fetchers: HashMap::new(),
      })),
    }
  }

  /// Return the entry for `key`, fetching it if it is absent or stale.
  ///
  /// - Disabled queries only read (and lazily create) the entry.
  /// - A fresh entry is a cache hit: no fetch.
  /// - A loading entry already has a request in flight which this call
  ///   joins instead of issuing a duplicate.
  /// - Anything else (idle, invalidated, errored) dispatches a new epoch.
  ///
  /// Never blocks on the network; the fetch runs as a spawned task.
  pub fn ensure_fresh<F, Fut>(&self, key: K, fetcher: F, enabled: bool) -> CacheEntry<K, V>
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
  {
    let fetcher: Fetcher<V> = Arc::new(move || fetcher().boxed());
    self.ensure_fresh_with(key, fetcher, enabled)
  }

  pub(crate) fn ensure_fresh_with(
    &self,
    key: K,
    fetcher: Fetcher<V>,
    enabled: bool,
  ) -> CacheEntry<K, V> {
    let mut inner = lock(&self.inner);
    let entry = inner.store.read(&key);
    if !enabled {
      return entry;
    }

    inner.fetchers.insert(key.clone(), fetcher);
    if entry.is_fresh() {
      debug!(query = %key.description(), "cache hit");
      return entry;
    }
    if entry.is_loading() {
      debug!(query = %key.description(), epoch = entry.epoch, "joining in-flight fetch");
      return entry;
    }

    self.dispatch(&mut inner, &key);
    inner.store.read(&key)
  }

  /// Force a new fetch for `key` with its last registered fetcher.
  ///
  /// Any fetch already in flight is superseded and its response dropped.
  /// Returns `None` if nothing ever registered a fetcher for `key`.
  pub fn refetch(&self, key: &K) -> Option<CacheEntry<K, V>> {
    let mut inner = lock(&self.inner);
    if !self.dispatch(&mut inner, key) {
      return None;
    }
    Some(inner.store.read(key))
  }

  /// Register `fetcher` for `key` and force a new fetch with it.
  pub(crate) fn refetch_with(&self, key: K, fetcher: Fetcher<V>) -> CacheEntry<K, V> {
    let mut inner = lock(&self.inner);
    inner.fetchers.insert(key.clone(), fetcher);
    self.dispatch(&mut inner, &key);
    inner.store.read(&key)
  }

  /// Mark entries matching `patterns` stale and schedule re-fetches.
  ///
  /// All patterns are applied before any re-fetch is dispatched. Keys with
  /// a live subscriber are re-fetched right away and publish straight to
  /// `Loading`; keys nobody observes are evicted and will be recreated on
  /// their next read.
  pub fn invalidate(&self, patterns: &[KeyPattern<K>]) -> Vec<K> {
    let mut inner = lock(&self.inner);

    let mut keys: Vec<K> = Vec::new();
    for pattern in patterns {
      for key in inner.store.invalidate(pattern) {
        if !keys.contains(&key) {
          keys.push(key);
        }
      }
    }
    info!(count = keys.len(), "invalidated queries");

    for key in &keys {
      if inner.store.reader_count(key) > 0 {
        if !self.dispatch(&mut inner, key) {
          inner.store.publish(key);
          debug!(query = %key.description(), "no fetcher registered, left stale");
        }
      } else {
        inner.store.evict(key);
        inner.fetchers.remove(key);
        debug!(query = %key.description(), "evicted unobserved query");
      }
    }
    keys
  }

  /// Subscribe to snapshots of `key`. A live receiver counts as an active
  /// reader for re-fetch scheduling.
  pub fn subscribe(&self, key: &K) -> watch::Receiver<CacheEntry<K, V>> {
    lock(&self.inner).store.subscribe(key)
  }

  /// Current entry for `key`, creating an idle one if absent.
  pub fn read(&self, key: &K) -> CacheEntry<K, V> {
    lock(&self.inner).store.read(key)
  }

  /// Current entry for `key` if one exists.
  pub fn entry(&self, key: &K) -> Option<CacheEntry<K, V>> {
    lock(&self.inner).store.peek(key)
  }

  /// Wait until `key` is no longer loading and return its entry.
  pub async fn settled(&self, key: &K) -> CacheEntry<K, V> {
    let mut rx = self.subscribe(key);
    let settled = rx
      .wait_for(|entry| !entry.is_loading())
      .await
      .map(|entry| (*entry).clone());
    match settled {
      Ok(entry) => entry,
      // Evicted while waiting
      Err(_) => self.read(key),
    }
  }

  /// Allocate a new epoch for `key` and spawn its fetch.
  fn dispatch(&self, inner: &mut Inner<K, V>, key: &K) -> bool {
    let Some(fetcher) = inner.fetchers.get(key).cloned() else {
      return false;
    };
    let epoch = inner.store.begin_fetch(key);
    debug!(query = %key.description(), epoch, "dispatching fetch");

    let future = fetcher();
    let shared = Arc::clone(&self.inner);
    let key = key.clone();
    tokio::spawn(async move {
      let outcome = future.await.map_err(|source| FetchError {
        query: key.description(),
        source,
      });
      let failed = outcome.as_ref().err().cloned();

      let mut inner = lock(&shared);
      if !inner.store.write(&key, epoch, outcome) {
        debug!(query = %key.description(), epoch, "discarded stale response");
      } else if let Some(err) = failed {
        warn!(query = %key.description(), epoch, error = %err, "fetch failed");
      }
    });
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::test_keys::{TestKey, TestKind};
  use crate::cache::QueryStatus;
  use std::collections::VecDeque;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;
  use tokio::sync::oneshot;

  fn counting_fetcher(
    counter: Arc<AtomicU32>,
  ) -> impl Fn() -> futures::future::Ready<Result<u32, ApiError>> + Send + Sync + 'static {
    move || futures::future::ready(Ok(counter.fetch_add(1, Ordering::SeqCst) + 1))
  }

  /// Fetcher whose n-th call resolves when the n-th gate is released.
  fn gated_fetcher(
    gates: Vec<oneshot::Receiver<u32>>,
  ) -> impl Fn() -> BoxFuture<'static, Result<u32, ApiError>> + Send + Sync + 'static {
    let gates = Arc::new(Mutex::new(VecDeque::from(gates)));
    move || {
      let gate = gates.lock().unwrap().pop_front();
      async move {
        match gate {
          Some(rx) => rx.await.map_err(|e| ApiError::Network(e.to_string())),
          None => Err(ApiError::Network("no gate".to_string())),
        }
      }
      .boxed()
    }
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_fetch() {
    let client: QueryClient<TestKey, u32> = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = TestKey::Item(1);

    let first = client.ensure_fresh(key.clone(), counting_fetcher(counter.clone()), true);
    let second = client.ensure_fresh(key.clone(), counting_fetcher(counter.clone()), true);
    assert_eq!(first.status, QueryStatus::Loading);
    assert_eq!(second.epoch, first.epoch);

    let entry = client.settled(&key).await;
    assert_eq!(entry.data(), Some(&1));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fresh_entry_is_cache_hit() {
    let client: QueryClient<TestKey, u32> = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = TestKey::Item(1);

    client.ensure_fresh(key.clone(), counting_fetcher(counter.clone()), true);
    client.settled(&key).await;

    let entry = client.ensure_fresh(key.clone(), counting_fetcher(counter.clone()), true);
    assert_eq!(entry.status, QueryStatus::Success);
    assert_eq!(entry.epoch, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_disabled_query_does_not_fetch() {
    let client: QueryClient<TestKey, u32> = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = TestKey::Item(1);

    let entry = client.ensure_fresh(key.clone(), counting_fetcher(counter.clone()), false);
    assert_eq!(entry.status, QueryStatus::Idle);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert!(client.entry(&key).is_some());
    assert!(client.refetch(&key).is_none());
  }

  #[tokio::test]
  async fn test_older_epoch_response_is_discarded() {
    let client: QueryClient<TestKey, u32> = QueryClient::new();
    let key = TestKey::Item(1);
    let (tx1, rx1) = oneshot::channel();
    let (tx2, rx2) = oneshot::channel();

    client.ensure_fresh(key.clone(), gated_fetcher(vec![rx1, rx2]), true);
    let entry = client.refetch(&key).unwrap();
    assert_eq!(entry.epoch, 2);

    tx2.send(2).unwrap();
    let entry = client.settled(&key).await;
    assert_eq!(entry.data(), Some(&2));

    tx1.send(1).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    let entry = client.read(&key);
    assert_eq!(entry.status, QueryStatus::Success);
    assert_eq!(entry.data(), Some(&2));
    assert_eq!(entry.epoch, 2);
  }

  #[tokio::test]
  async fn test_error_keeps_data_and_retry_refetches() {
    let client: QueryClient<TestKey, u32> = QueryClient::new();
    let key = TestKey::Item(1);
    let calls = Arc::new(AtomicU32::new(0));
    let calls_clone = calls.clone();
    let fetcher = move || {
      let n = calls_clone.fetch_add(1, Ordering::SeqCst);
      async move {
        match n {
          1 => Err(ApiError::Network("offline".to_string())),
          _ => Ok(n),
        }
      }
    };

    client.ensure_fresh(key.clone(), fetcher, true);
    assert_eq!(client.settled(&key).await.data(), Some(&0));

    client.refetch(&key);
    let entry = client.settled(&key).await;
    assert_eq!(entry.status, QueryStatus::Error);
    assert_eq!(entry.data(), Some(&0));
    assert_eq!(
      entry.error.map(|e| e.source),
      Some(ApiError::Network("offline".to_string()))
    );

    // Errored entries are not fresh: the next read retries
    let entry = client.ensure_fresh(key.clone(), || async { Ok(9) }, true);
    assert_eq!(entry.status, QueryStatus::Loading);
    assert_eq!(client.settled(&key).await.data(), Some(&9));
  }

  #[tokio::test]
  async fn test_invalidate_refetches_observed_and_evicts_unobserved() {
    let client: QueryClient<TestKey, u32> = QueryClient::new();
    let counter = Arc::new(AtomicU32::new(0));
    let observed = TestKey::List("a");
    let unobserved = TestKey::List("b");
    let other = TestKey::Item(1);

    let _rx = client.subscribe(&observed);
    for key in [&observed, &unobserved, &other] {
      client.ensure_fresh(key.clone(), counting_fetcher(counter.clone()), true);
      client.settled(key).await;
    }
    assert_eq!(counter.load(Ordering::SeqCst), 3);

    let mut keys = client.invalidate(&[KeyPattern::Kind(TestKind::List)]);
    keys.sort_by_key(|k| format!("{:?}", k));
    assert_eq!(keys, vec![observed.clone(), unobserved.clone()]);

    let entry = client.read(&observed);
    assert_eq!(entry.status, QueryStatus::Loading);
    assert!(entry.invalidated);
    assert!(entry.data.is_some());
    assert!(client.entry(&unobserved).is_none());
    assert!(client.entry(&other).unwrap().is_fresh());

    let entry = client.settled(&observed).await;
    assert!(entry.is_fresh());
    assert_eq!(entry.data(), Some(&4));
    assert_eq!(counter.load(Ordering::SeqCst), 4);
  }

  #[tokio::test]
  async fn test_invalidate_during_fetch_drops_superseded_response() {
    let client: QueryClient<TestKey, u32> = QueryClient::new();
    let key = TestKey::Item(1);
    let (tx1, rx1) = oneshot::channel();
    let (tx2, rx2) = oneshot::channel();
    let _rx = client.subscribe(&key);

    client.ensure_fresh(key.clone(), gated_fetcher(vec![rx1, rx2]), true);
    client.invalidate(&[KeyPattern::Exact(key.clone())]);

    tx1.send(1).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(client.read(&key).data.is_none());

    tx2.send(2).unwrap();
    assert_eq!(client.settled(&key).await.data(), Some(&2));
  }

  #[tokio::test]
  async fn test_fetch_started_before_eviction_cannot_land() {
    let client: QueryClient<TestKey, u32> = QueryClient::new();
    let key = TestKey::List("a");
    let (old_tx, old_rx) = oneshot::channel();
    let (new_tx, new_rx) = oneshot::channel();

    let before = client.ensure_fresh(key.clone(), gated_fetcher(vec![old_rx]), true);
    let evicted = client.invalidate(&[KeyPattern::Kind(TestKind::List)]);
    assert_eq!(evicted, vec![key.clone()]);
    assert!(client.entry(&key).is_none());

    let after = client.ensure_fresh(key.clone(), gated_fetcher(vec![new_rx]), true);
    assert_eq!(after.status, QueryStatus::Loading);
    assert!(after.epoch > before.epoch);

    new_tx.send(200).unwrap();
    assert_eq!(client.settled(&key).await.data(), Some(&200));

    old_tx.send(100).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    let entry = client.read(&key);
    assert_eq!(entry.data(), Some(&200));
    assert_eq!(entry.epoch, after.epoch);
  }

  #[tokio::test]
  async fn test_observed_invalidation_publishes_loading_directly() {
    let client: QueryClient<TestKey, u32> = QueryClient::new();
    let key = TestKey::Item(1);
    let mut rx = client.subscribe(&key);
    client.ensure_fresh(key.clone(), || async { Ok(1) }, true);
    client.settled(&key).await;
    rx.borrow_and_update();

    client.invalidate(&[KeyPattern::Exact(key.clone())]);
    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.status, QueryStatus::Loading);
    assert!(snapshot.invalidated);
  }

  #[tokio::test]
  async fn test_independent_clients_do_not_share_entries() {
    let a: QueryClient<TestKey, u32> = QueryClient::new();
    let b: QueryClient<TestKey, u32> = QueryClient::new();
    let key = TestKey::Item(1);

    a.ensure_fresh(key.clone(), || async { Ok(1) }, true);
    a.settled(&key).await;

    assert!(b.entry(&key).is_none());
    assert!(a.clone().entry(&key).unwrap().is_fresh());
  }
}
