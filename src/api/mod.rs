//! Board API: domain types, wire formats, transport and cache bindings.

pub mod api_types;
pub mod cache;
pub mod client;
pub mod invalidation;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use cache::{BoardQueryKey, QueryData, ResourceKind};
pub use client::BoardApi;
pub use invalidation::{Entity, Mutation};
pub use transport::{ApiRequest, HttpTransport, Transport};
