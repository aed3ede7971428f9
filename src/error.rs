//! Error types shared by the cache core and the board API.

use thiserror::Error;

/// Failure talking to the remote API.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
  /// The request never produced a response (connection, DNS, timeout).
  #[error("network error: {0}")]
  Network(String),

  /// The server answered with a non-success status.
  #[error("server returned {status}: {body}")]
  Status { status: u16, body: String },

  /// The response body did not match the expected payload shape.
  #[error("unexpected response payload: {0}")]
  Decode(String),
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    ApiError::Decode(err.to_string())
  }
}

/// A query's fetch failed. Stored on the cache entry, never propagated further.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to load {query}: {source}")]
pub struct FetchError {
  /// Human description of the query key that failed
  pub query: String,
  #[source]
  pub source: ApiError,
}

/// A write failed. Returned to the caller; no cache state was touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{action} failed: {source}")]
pub struct MutationError {
  pub action: String,
  #[source]
  pub source: ApiError,
}
