//! Mutation coordinator: runs writes and invalidates what they touched.

use std::future::Future;
use tracing::{info, warn};

use crate::cache::{KeyPattern, QueryKey};
use crate::error::{ApiError, MutationError};
use crate::query::QueryClient;

/// Executes write requests against the remote API.
///
/// Writes are never applied to the cache locally. A confirmed write
/// invalidates the affected queries, which re-fetch from the server; a
/// failed write leaves the cache untouched.
pub struct MutationCoordinator<K: QueryKey, V> {
  queries: QueryClient<K, V>,
}

impl<K: QueryKey, V> Clone for MutationCoordinator<K, V> {
  fn clone(&self) -> Self {
    Self {
      queries: self.queries.clone(),
    }
  }
}

impl<K: QueryKey, V: Send + Sync + 'static> MutationCoordinator<K, V> {
  pub fn new(queries: QueryClient<K, V>) -> Self {
    Self { queries }
  }

  /// Send `request` once and, if it succeeds, invalidate `invalidates`.
  ///
  /// Observed keys are re-fetched; unobserved ones are dropped and refresh
  /// lazily on their next read. No retry on failure.
  pub async fn perform<T, Fut>(
    &self,
    action: &str,
    invalidates: &[KeyPattern<K>],
    request: Fut,
  ) -> Result<T, MutationError>
  where
    Fut: Future<Output = Result<T, ApiError>>,
  {
    match request.await {
      Ok(value) => {
        let keys = self.queries.invalidate(invalidates);
        info!(action, invalidated = keys.len(), "mutation applied");
        Ok(value)
      }
      Err(source) => {
        warn!(action, error = %source, "mutation failed");
        Err(MutationError {
          action: action.to_string(),
          source,
        })
      }
    }
  }
}
