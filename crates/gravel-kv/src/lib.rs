//! gravel-kv — ordered key-value store facade for gravel.
//!
//! The namespace layer consumes storage purely through the traits in
//! [`traits`]: point reads and writes, forward range iteration bounded by
//! `[lower, upper)`, and atomic read-only / read-write batches.
//!
//! # Architecture
//!
//! [`RedbStore`] is the shipped engine. Every key and value lives in a single
//! redb table of `&[u8] → &[u8]`, so the whole keyspace is one flat ordered
//! byte-string space. Batches map onto redb transactions: a read-only batch
//! sees one consistent snapshot, a read-write batch either commits every write
//! or none of them.
//!
//! The `RedbStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use store::RedbStore;
pub use traits::{KvIter, KvPair, KvReadWriter, KvReader, KvStore};
