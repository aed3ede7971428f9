//! Async query coordination over the cache store.
//!
//! Inspired by TanStack Query: a `QueryClient` owns the cache, deduplicates
//! concurrent reads of the same key and drops out-of-order responses, and a
//! `QueryObserver` follows one caller's current key.

mod client;
mod observer;

pub use client::{Fetcher, QueryClient};
pub use observer::QueryObserver;
