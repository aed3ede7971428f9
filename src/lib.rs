//! Client-side synchronization for a remote kanban board API.
//!
//! Reads go through a keyed in-memory cache that deduplicates concurrent
//! requests and drops out-of-order responses. Writes go to the server first
//! and invalidate the cached queries they affect.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod logging;
pub mod mutation;
pub mod query;
pub mod sync;

pub use error::{ApiError, FetchError, MutationError};
pub use sync::{BoardSync, SyncSettings};
