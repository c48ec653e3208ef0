//! Garbage collector — background reclamation of tombstoned namespaces.
//!
//! Each cycle:
//!
//! 1. **Discover**: scan `[meta/, meta0)` in one read snapshot and collect
//!    every name whose marker is `DELETING`.
//! 2. **Wipe**: for each candidate, open one read-write batch, delete every
//!    key in `[data/{name}/, data/{name}0)` and then the meta entry, commit.
//!
//! A discovery failure aborts the cycle before anything is deleted. A wipe
//! failure rolls back that namespace's batch only; the remaining candidates
//! are still processed and the failed one is rediscovered next cycle.

use gravel_kv::{KvReadWriter, KvStore, StoreResult};
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, warn};

use crate::error::{NamespaceError, NamespaceResult};
use crate::keys;
use crate::service::{NamespaceService, meta_name, read_state};
use crate::ticker::Ticker;
use crate::types::NamespaceState;

/// Outcome of one collection cycle.
#[derive(Debug, Default)]
pub struct GcReport {
    /// Namespaces fully removed this cycle, in discovery order.
    pub reclaimed: Vec<String>,
    /// Namespaces whose batch was rolled back.
    pub failed: Vec<GcFailure>,
}

impl GcReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A namespace whose reclamation failed, with the error that aborted it.
#[derive(Debug)]
pub struct GcFailure {
    pub namespace: String,
    pub error: NamespaceError,
}

impl<S: KvStore> NamespaceService<S> {
    /// Names of every namespace currently marked `DELETING`, in key order.
    pub fn deleted_namespaces(&self) -> NamespaceResult<Vec<String>> {
        let range = keys::meta_range();
        self.store.ro_batch(|r| {
            let mut names = Vec::new();
            for entry in r.range(&range.lower, range.upper.as_deref())? {
                let (key, value) = entry?;
                if NamespaceState::from_marker(&value) != Some(NamespaceState::Deleting) {
                    continue;
                }
                match meta_name(&key) {
                    Ok(name) => names.push(name),
                    Err(e) => warn!(error = %e, "skipping undecodable meta key"),
                }
            }
            Ok(names)
        })
    }

    /// Run one collection cycle.
    ///
    /// Returns `Err` only when discovery fails; per-namespace failures are
    /// collected in the report.
    pub fn collect_garbage(&self) -> NamespaceResult<GcReport> {
        let _entered = self.span.enter();
        debug!("finding deleted namespaces");

        let names = self.deleted_namespaces()?;
        let mut report = GcReport::default();
        if names.is_empty() {
            debug!("no namespace for garbage collection");
            return Ok(report);
        }

        for name in names {
            info!(namespace = %name, "garbage collecting");
            match self.wipe_namespace(&name) {
                Ok(Some(keys_removed)) => {
                    info!(namespace = %name, keys_removed, "namespace reclaimed");
                    report.reclaimed.push(name);
                }
                Ok(None) => {
                    debug!(namespace = %name, "namespace no longer marked for deletion");
                }
                Err(e) => {
                    error!(namespace = %name, error = %e, "garbage collecting namespace failed");
                    report.failed.push(GcFailure {
                        namespace: name,
                        error: e,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Remove every data key of `name` and its meta entry in one batch.
    ///
    /// Returns the number of data keys removed, or `None` when the meta
    /// entry was no longer `DELETING` by the time the batch started.
    fn wipe_namespace(&self, name: &str) -> NamespaceResult<Option<usize>> {
        self.store.rw_batch(|rw| {
            if read_state(&*rw, name)? != Some(NamespaceState::Deleting) {
                return Ok(None);
            }

            let removed = wipe_range(rw, &keys::data_range(name))?;
            rw.delete(&keys::encode_meta(name))?;
            Ok(Some(removed))
        })
    }

    /// Run the collector until `shutdown` flips to `true` (or its sender is
    /// dropped) or `ticker` stops.
    ///
    /// Cancellation is observed only between cycles; a cycle that has started
    /// always finishes its current batch.
    pub async fn garbage_collection<T: Ticker>(
        &self,
        shutdown: watch::Receiver<bool>,
        ticker: T,
    ) {
        let span = self.span.clone();
        self.collector_loop(shutdown, ticker).instrument(span).await
    }

    async fn collector_loop<T: Ticker>(&self, mut shutdown: watch::Receiver<bool>, mut ticker: T) {
        info!("starting garbage collection in background");

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("shutdown sender dropped");
                        break;
                    }
                }
                tick = ticker.tick() => {
                    if tick.is_none() {
                        info!("ticker stopped");
                        break;
                    }
                    if let Err(e) = self.collect_garbage() {
                        error!(error = %e, "discovering deleted namespaces failed");
                    }
                }
            }
        }

        ticker.stop();
        info!("garbage collection stopped");
    }
}

/// Delete every key in `range`. Keys are gathered first because the batch
/// cannot be iterated and mutated at the same time.
fn wipe_range(rw: &mut dyn KvReadWriter, range: &keys::KeyRange) -> StoreResult<usize> {
    let doomed = rw
        .range(&range.lower, range.upper.as_deref())?
        .map(|entry| entry.map(|(key, _)| key))
        .collect::<StoreResult<Vec<_>>>()?;

    for key in &doomed {
        rw.delete(key)?;
    }
    Ok(doomed.len())
}
