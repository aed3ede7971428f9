//! In-memory cache store: one entry per query key, no network knowledge.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

use super::entry::{CacheEntry, QueryStatus};
use super::traits::{KeyPattern, QueryKey};
use crate::error::FetchError;

/// An entry plus the channel its snapshots are published on.
struct Slot<K, V> {
  entry: CacheEntry<K, V>,
  tx: watch::Sender<CacheEntry<K, V>>,
}

impl<K: Clone, V> Slot<K, V> {
  fn new(key: K) -> Self {
    let entry = CacheEntry::idle(key);
    let (tx, _) = watch::channel(entry.clone());
    Self { entry, tx }
  }

  fn publish(&self) {
    self.tx.send_replace(self.entry.clone());
  }
}

/// Cache store holding at most one entry per distinct key.
///
/// Every change to an entry is published to its subscribers as a snapshot.
/// The store itself never suspends; callers serialize access to it.
pub struct CacheStore<K: QueryKey, V> {
  slots: HashMap<K, Slot<K, V>>,
  /// Last epoch handed out, across all keys
  last_epoch: u64,
}

impl<K: QueryKey, V> Default for CacheStore<K, V> {
  fn default() -> Self {
    Self {
      slots: HashMap::new(),
      last_epoch: 0,
    }
  }
}

impl<K: QueryKey, V> CacheStore<K, V> {
  pub fn new() -> Self {
    Self::default()
  }

  fn slot(&mut self, key: &K) -> &mut Slot<K, V> {
    self
      .slots
      .entry(key.clone())
      .or_insert_with(|| Slot::new(key.clone()))
  }

  /// Current entry for `key`, creating an idle one if absent.
  pub fn read(&mut self, key: &K) -> CacheEntry<K, V> {
    self.slot(key).entry.clone()
  }

  /// Current entry for `key` without creating it.
  pub fn peek(&self, key: &K) -> Option<CacheEntry<K, V>> {
    self.slots.get(key).map(|slot| slot.entry.clone())
  }

  /// Subscribe to snapshots of `key`, creating an idle entry if absent.
  pub fn subscribe(&mut self, key: &K) -> watch::Receiver<CacheEntry<K, V>> {
    self.slot(key).tx.subscribe()
  }

  /// Number of live subscribers on `key`.
  pub fn reader_count(&self, key: &K) -> usize {
    self
      .slots
      .get(key)
      .map(|slot| slot.tx.receiver_count())
      .unwrap_or(0)
  }

  fn next_epoch(&mut self) -> u64 {
    self.last_epoch += 1;
    self.last_epoch
  }

  /// Allocate the next epoch for `key` and mark it loading.
  ///
  /// Epochs are store-wide, so a fetch dispatched before `key` was evicted
  /// can never match the epoch of its recreated entry.
  pub fn begin_fetch(&mut self, key: &K) -> u64 {
    let epoch = self.next_epoch();
    let slot = self.slot(key);
    slot.entry.epoch = epoch;
    slot.entry.status = QueryStatus::Loading;
    slot.publish();
    epoch
  }

  /// Commit a fetch outcome.
  ///
  /// Only lands if `epoch` is still the entry's current epoch. Returns
  /// `false` when the response was stale (or the entry was evicted) and was
  /// dropped.
  pub fn write(&mut self, key: &K, epoch: u64, outcome: Result<V, FetchError>) -> bool {
    let Some(slot) = self.slots.get_mut(key) else {
      return false;
    };
    if slot.entry.epoch != epoch {
      return false;
    }

    match outcome {
      Ok(data) => {
        slot.entry.status = QueryStatus::Success;
        slot.entry.data = Some(Arc::new(data));
        slot.entry.error = None;
        slot.entry.invalidated = false;
        slot.entry.updated_at = Some(Utc::now());
      }
      Err(err) => {
        // Previously cached data stays visible
        slot.entry.status = QueryStatus::Error;
        slot.entry.error = Some(err);
      }
    }
    slot.publish();
    true
  }

  /// Mark every entry matching `pattern` stale and return their keys.
  ///
  /// Data is kept. An in-flight fetch is retired by moving the entry to a
  /// fresh epoch so its response can no longer land.
  ///
  /// Nothing is published here. The caller follows up on each returned key
  /// with `begin_fetch`, `evict` or `publish`, so subscribers never observe
  /// the intermediate idle state of a key about to be re-fetched.
  pub fn invalidate(&mut self, pattern: &KeyPattern<K>) -> Vec<K> {
    let mut invalidated = Vec::new();
    for (key, slot) in self.slots.iter_mut() {
      if !pattern.matches(key) {
        continue;
      }
      if slot.entry.status.is_loading() {
        self.last_epoch += 1;
        slot.entry.epoch = self.last_epoch;
      }
      slot.entry.status = QueryStatus::Idle;
      slot.entry.invalidated = true;
      invalidated.push(key.clone());
    }
    invalidated
  }

  /// Publish the current snapshot of `key` to its subscribers.
  pub fn publish(&self, key: &K) {
    if let Some(slot) = self.slots.get(key) {
      slot.publish();
    }
  }

  /// Drop the entry for `key`. The next read recreates it idle; the epoch
  /// counter is not reset.
  pub fn evict(&mut self, key: &K) -> bool {
    self.slots.remove(key).is_some()
  }

  pub fn len(&self) -> usize {
    self.slots.len()
  }

  pub fn is_empty(&self) -> bool {
    self.slots.is_empty()
  }
}
