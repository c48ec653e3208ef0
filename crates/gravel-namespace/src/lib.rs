//! gravel-namespace — logical multi-tenancy over one ordered keyspace.
//!
//! Each namespace is one meta entry holding its lifecycle marker plus any
//! number of data entries under a namespace-private prefix:
//!
//! ```text
//! meta/{name}          → EXISTS | DELETING
//! data/{name}/{key}    → opaque bytes
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! ABSENT ──create──▶ EXISTS ──delete──▶ DELETING ──gc──▶ ABSENT
//! ```
//!
//! Deletion only writes the `DELETING` tombstone and returns. The garbage
//! collector, a background task paced by a [`Ticker`], later discovers
//! tombstones with a bounded scan of the meta range and wipes each
//! namespace's data and meta entry in one atomic read-write batch.

pub mod error;
pub mod gc;
pub mod keys;
pub mod service;
pub mod ticker;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{NamespaceError, NamespaceResult};
pub use gc::{GcFailure, GcReport};
pub use service::NamespaceService;
pub use ticker::{IntervalTicker, ManualTicker, ManualTickerHandle, Ticker};
pub use types::{NamespaceInfo, NamespaceState};
