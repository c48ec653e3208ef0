//! Fault-injecting store wrapper for unit tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gravel_kv::{KvIter, KvReadWriter, KvReader, KvStore, RedbStore, StoreError, StoreResult};

/// Which operations fail.
#[derive(Debug, Default)]
pub(crate) struct Faults {
    /// `get` of exactly this key fails.
    pub get_key: Option<Vec<u8>>,
    /// `set` of exactly this key fails.
    pub set_key: Option<Vec<u8>>,
    /// `delete` of any key under this prefix fails, batched or not.
    pub delete_prefix: Option<Vec<u8>>,
    /// Every `range` call fails.
    pub range: bool,
}

/// In-memory redb store that fails on demand and counts facade calls.
#[derive(Clone)]
pub(crate) struct FaultyStore {
    inner: RedbStore,
    faults: Arc<Faults>,
    ops: Arc<AtomicUsize>,
}

impl FaultyStore {
    pub fn new(faults: Faults) -> Self {
        Self {
            inner: RedbStore::open_in_memory().unwrap(),
            faults: Arc::new(faults),
            ops: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn healthy() -> Self {
        Self::new(Faults::default())
    }

    /// Number of facade calls made so far.
    pub fn ops(&self) -> usize {
        self.ops.load(Ordering::SeqCst)
    }

    /// Raw access that bypasses fault injection and counting.
    pub fn raw(&self) -> &RedbStore {
        &self.inner
    }

    fn count(&self) {
        self.ops.fetch_add(1, Ordering::SeqCst);
    }
}

fn injected(op: &str) -> StoreError {
    StoreError::Write(format!("injected {op} failure"))
}

fn check_get(faults: &Faults, key: &[u8]) -> StoreResult<()> {
    match &faults.get_key {
        Some(bad) if bad == key => Err(injected("get")),
        _ => Ok(()),
    }
}

fn check_set(faults: &Faults, key: &[u8]) -> StoreResult<()> {
    match &faults.set_key {
        Some(bad) if bad == key => Err(injected("set")),
        _ => Ok(()),
    }
}

fn check_delete(faults: &Faults, key: &[u8]) -> StoreResult<()> {
    match &faults.delete_prefix {
        Some(prefix) if key.starts_with(prefix) => Err(injected("delete")),
        _ => Ok(()),
    }
}

fn check_range(faults: &Faults) -> StoreResult<()> {
    if faults.range {
        return Err(injected("range"));
    }
    Ok(())
}

impl KvReader for FaultyStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.count();
        check_get(&self.faults, key)?;
        self.inner.get(key)
    }

    fn range(&self, lower: &[u8], upper: Option<&[u8]>) -> StoreResult<KvIter<'_>> {
        self.count();
        check_range(&self.faults)?;
        self.inner.range(lower, upper)
    }
}

impl KvStore for FaultyStore {
    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.count();
        check_set(&self.faults, key)?;
        self.inner.set(key, value)
    }

    fn delete(&self, key: &[u8]) -> StoreResult<()> {
        self.count();
        check_delete(&self.faults, key)?;
        self.inner.delete(key)
    }

    fn ro_batch<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn KvReader) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.count();
        let faults = &self.faults;
        self.inner.ro_batch(|r| {
            let view = FaultyReader { inner: r, faults };
            f(&view)
        })
    }

    fn rw_batch<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn KvReadWriter) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.count();
        let faults = &self.faults;
        self.inner.rw_batch(|rw| {
            let mut batch = FaultyBatch { inner: rw, faults };
            f(&mut batch)
        })
    }
}

struct FaultyReader<'a> {
    inner: &'a dyn KvReader,
    faults: &'a Faults,
}

impl KvReader for FaultyReader<'_> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        check_get(self.faults, key)?;
        self.inner.get(key)
    }

    fn range(&self, lower: &[u8], upper: Option<&[u8]>) -> StoreResult<KvIter<'_>> {
        check_range(self.faults)?;
        self.inner.range(lower, upper)
    }
}

struct FaultyBatch<'a> {
    inner: &'a mut dyn KvReadWriter,
    faults: &'a Faults,
}

impl KvReader for FaultyBatch<'_> {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        check_get(self.faults, key)?;
        self.inner.get(key)
    }

    fn range(&self, lower: &[u8], upper: Option<&[u8]>) -> StoreResult<KvIter<'_>> {
        check_range(self.faults)?;
        self.inner.range(lower, upper)
    }
}

impl KvReadWriter for FaultyBatch<'_> {
    fn set(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        check_set(self.faults, key)?;
        self.inner.set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<()> {
        check_delete(self.faults, key)?;
        self.inner.delete(key)
    }
}
