//! RedbStore — redb-backed ordered key-value store.
//!
//! Implements the [`KvStore`] facade over a single redb table. Point
//! operations each run in their own transaction; batches map one-to-one
//! onto a redb read or write transaction. The store supports both on-disk
//! and in-memory backends (the latter for testing).

use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadOnlyTable, ReadableDatabase, ReadableTable, Table};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::tables::ENTRIES;
use crate::traits::{KvIter, KvReadWriter, KvReader, KvStore};

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Thread-safe ordered store backed by redb.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "kv store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory kv store opened");
        Ok(store)
    }

    /// Create the entries table if it doesn't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(ENTRIES).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Commit))?;
        Ok(())
    }

    fn read_table(&self) -> StoreResult<ReadOnlyTable<&'static [u8], &'static [u8]>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        txn.open_table(ENTRIES).map_err(map_err!(Table))
    }
}

impl KvReader for RedbStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        let table = self.read_table()?;
        table_get(&table, key)
    }

    fn range(&self, lower: &[u8], upper: Option<&[u8]>) -> StoreResult<KvIter<'_>> {
        // The table is local to this call; callers needing a streaming
        // snapshot go through `ro_batch`.
        let table = self.read_table()?;
        let entries: Vec<_> = table_range(&table, lower, upper)?.collect();
        Ok(Box::new(entries.into_iter()))
    }
}

impl KvStore for RedbStore {
    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(ENTRIES).map_err(map_err!(Table))?;
            table.insert(key, value).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Commit))?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(ENTRIES).map_err(map_err!(Table))?;
            table.remove(key).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Commit))?;
        Ok(())
    }

    fn ro_batch<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn KvReader) -> Result<T, E>,
        E: From<StoreError>,
    {
        let table = self.read_table()?;
        let snapshot = ReadBatch { table };
        f(&snapshot)
    }

    fn rw_batch<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn KvReadWriter) -> Result<T, E>,
        E: From<StoreError>,
    {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let outcome = {
            let table = txn.open_table(ENTRIES).map_err(map_err!(Table))?;
            let mut batch = WriteBatch { table };
            f(&mut batch)
        };

        match outcome {
            Ok(value) => {
                txn.commit().map_err(map_err!(Commit))?;
                Ok(value)
            }
            Err(e) => {
                if let Err(abort_err) = txn.abort() {
                    warn!(error = %abort_err, "failed to abort write batch");
                }
                debug!("write batch rolled back");
                Err(e)
            }
        }
    }
}

/// Snapshot handed to read-only batch closures.
struct ReadBatch {
    table: ReadOnlyTable<&'static [u8], &'static [u8]>,
}

impl KvReader for ReadBatch {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        table_get(&self.table, key)
    }

    fn range(&self, lower: &[u8], upper: Option<&[u8]>) -> StoreResult<KvIter<'_>> {
        table_range(&self.table, lower, upper)
    }
}

/// Open table handed to read-write batch closures. Writes stay staged in the
/// enclosing transaction until the batch commits.
struct WriteBatch<'txn> {
    table: Table<'txn, &'static [u8], &'static [u8]>,
}

impl KvReader for WriteBatch<'_> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        table_get(&self.table, key)
    }

    fn range(&self, lower: &[u8], upper: Option<&[u8]>) -> StoreResult<KvIter<'_>> {
        table_range(&self.table, lower, upper)
    }
}

impl KvReadWriter for WriteBatch<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.table.insert(key, value).map_err(map_err!(Write))?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        self.table.remove(key).map_err(map_err!(Write))?;
        Ok(())
    }
}

fn table_get<T>(table: &T, key: &[u8]) -> StoreResult<Option<Vec<u8>>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    let guard = table.get(key).map_err(map_err!(Read))?;
    Ok(guard.map(|value| value.value().to_vec()))
}

fn table_range<'t, T>(table: &'t T, lower: &[u8], upper: Option<&[u8]>) -> StoreResult<KvIter<'t>>
where
    T: ReadableTable<&'static [u8], &'static [u8]>,
{
    if upper.is_some_and(|upper| upper <= lower) {
        return Ok(Box::new(std::iter::empty()));
    }

    let bounds: (Bound<&[u8]>, Bound<&[u8]>) = (
        Bound::Included(lower),
        upper.map_or(Bound::Unbounded, Bound::Excluded),
    );
    let range = table.range::<&[u8]>(bounds).map_err(map_err!(Read))?;
    Ok(Box::new(range.map(|entry| {
        let (key, value) = entry.map_err(map_err!(Read))?;
        Ok((key.value().to_vec(), value.value().to_vec()))
    })))
}
