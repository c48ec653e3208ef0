//! The ordered store facade consumed by the namespace layer.
//!
//! Three capability sets:
//!
//! - [`KvReader`]: point reads and bounded forward iteration.
//! - [`KvReadWriter`]: a reader that can also stage writes, handed out
//!   inside read-write batches.
//! - [`KvStore`]: the top-level handle. Non-batched writes, plus
//!   [`KvStore::ro_batch`] and [`KvStore::rw_batch`] for atomic groups.

use crate::error::{StoreError, StoreResult};

/// An owned `(key, value)` pair yielded by range iteration.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Forward iterator over a `[lower, upper)` key range, in ascending key order.
///
/// Dropping the iterator releases whatever snapshot backs it.
pub type KvIter<'a> = Box<dyn Iterator<Item = StoreResult<KvPair>> + 'a>;

/// Read access to an ordered keyspace.
pub trait KvReader {
    /// Fetch the value stored under `key`, or `None` when absent.
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    /// Report whether `key` is present.
    fn has(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Iterate keys in `[lower, upper)`. `upper = None` means unbounded.
    ///
    /// An empty or inverted range yields nothing.
    fn range(&self, lower: &[u8], upper: Option<&[u8]>) -> StoreResult<KvIter<'_>>;
}

/// Staged writes inside a read-write batch. Reads observe the batch's own
/// uncommitted writes.
pub trait KvReadWriter: KvReader {
    /// Insert or overwrite `key`.
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> StoreResult<()>;
}

/// Top-level store handle, safe to share between concurrent callers.
pub trait KvStore: KvReader + Clone + Send + Sync + 'static {
    /// Insert or overwrite `key` in its own atomic write.
    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Remove `key` in its own atomic write. Idempotent.
    fn delete(&self, key: &[u8]) -> StoreResult<()>;

    /// Run `f` against one consistent read snapshot.
    fn ro_batch<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn KvReader) -> Result<T, E>,
        E: From<StoreError>;

    /// Run `f` inside one atomic write. The batch commits only when `f`
    /// returns `Ok`; on `Err` every staged write is discarded.
    fn rw_batch<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn KvReadWriter) -> Result<T, E>,
        E: From<StoreError>;
}
