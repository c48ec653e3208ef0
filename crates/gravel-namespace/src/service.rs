//! NamespaceService — lifecycle manager for namespaces.
//!
//! Owns the meta-entry state machine and gates every data-key operation on
//! the namespace being `EXISTS`. The gate is a plain read followed by the
//! physical operation, not one atomic step: an operation that already
//! passed the check may still land after a concurrent `delete_namespace`,
//! and a later collection cycle may remove what it wrote. Nothing here
//! holds an in-process lock; the store is the only coordination point.

use gravel_kv::{KvReader, KvStore};
use tracing::{Span, debug, info, info_span};

use crate::error::{NamespaceError, NamespaceResult};
use crate::keys;
use crate::types::{NamespaceInfo, NamespaceState};

/// Namespace lifecycle manager over any [`KvStore`].
#[derive(Clone)]
pub struct NamespaceService<S> {
    pub(crate) store: S,
    pub(crate) span: Span,
}

impl<S: KvStore> NamespaceService<S> {
    /// Create a service backed by `store`.
    pub fn new(store: S) -> Self {
        Self {
            store,
            span: info_span!("namespace_service"),
        }
    }

    /// Record this service's events, and its collector loop, under `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read the lifecycle marker of `name`. `None` means the namespace has
    /// never been created or has been fully reclaimed.
    pub fn namespace_state(&self, name: &str) -> NamespaceResult<Option<NamespaceState>> {
        keys::validate_name(name)?;
        read_state(&self.store, name)
    }

    /// True only when `name` is `EXISTS`.
    pub fn is_active(&self, name: &str) -> NamespaceResult<bool> {
        Ok(self.namespace_state(name)? == Some(NamespaceState::Exists))
    }

    /// Create `name`.
    ///
    /// Fails with `AlreadyExists` for a live namespace and with `Deleting`
    /// while a previous incarnation is still waiting for reclamation, so new
    /// writes can never be swept up by a collection cycle in flight.
    pub fn create_namespace(&self, name: &str) -> NamespaceResult<()> {
        let _entered = self.span.enter();
        match self.namespace_state(name)? {
            Some(NamespaceState::Exists) => Err(NamespaceError::AlreadyExists),
            Some(NamespaceState::Deleting) => Err(NamespaceError::Deleting),
            None => {
                self.store
                    .set(&keys::encode_meta(name), NamespaceState::Exists.marker())?;
                info!(namespace = %name, "namespace created");
                Ok(())
            }
        }
    }

    /// Tombstone `name` and return. Data is removed later by the collector.
    ///
    /// Deletion is one-shot: a second call fails with `Deleting`.
    pub fn delete_namespace(&self, name: &str) -> NamespaceResult<()> {
        let _entered = self.span.enter();
        match self.namespace_state(name)? {
            None => Err(NamespaceError::NotFound),
            Some(NamespaceState::Deleting) => Err(NamespaceError::Deleting),
            Some(NamespaceState::Exists) => {
                self.store
                    .set(&keys::encode_meta(name), NamespaceState::Deleting.marker())?;
                info!(namespace = %name, "namespace marked for deletion");
                Ok(())
            }
        }
    }

    /// List every known namespace with its state, in name order.
    pub fn list_namespaces(&self) -> NamespaceResult<Vec<NamespaceInfo>> {
        let range = keys::meta_range();
        self.store.ro_batch(|r| {
            let mut namespaces = Vec::new();
            for entry in r.range(&range.lower, range.upper.as_deref())? {
                let (key, value) = entry?;
                let name = meta_name(&key)?;
                let state = NamespaceState::from_marker(&value)
                    .ok_or_else(|| NamespaceError::Corrupt { name: name.clone() })?;
                namespaces.push(NamespaceInfo { name, state });
            }
            Ok(namespaces)
        })
    }

    /// Read `key` from namespace `ns`.
    pub fn get_key(&self, ns: &str, key: &str) -> NamespaceResult<Vec<u8>> {
        let _entered = self.span.enter();
        self.ensure_active(ns)?;
        self.store
            .get(&keys::encode_data(ns, key))?
            .ok_or(NamespaceError::KeyNotFound)
    }

    /// Insert or overwrite `key` in namespace `ns`.
    pub fn set_key(&self, ns: &str, key: &str, value: &[u8]) -> NamespaceResult<()> {
        let _entered = self.span.enter();
        self.ensure_active(ns)?;
        self.store.set(&keys::encode_data(ns, key), value)?;
        Ok(())
    }

    /// Remove `key` from namespace `ns`. Removing an absent key succeeds.
    pub fn delete_key(&self, ns: &str, key: &str) -> NamespaceResult<()> {
        let _entered = self.span.enter();
        self.ensure_active(ns)?;
        self.store.delete(&keys::encode_data(ns, key))?;
        Ok(())
    }

    /// Never-created and tombstoned namespaces look the same to key callers.
    fn ensure_active(&self, ns: &str) -> NamespaceResult<()> {
        if !self.is_active(ns)? {
            debug!(namespace = %ns, "rejecting key operation on inactive namespace");
            return Err(NamespaceError::NotFound);
        }
        Ok(())
    }
}

/// Read and parse the meta entry of an already validated name.
pub(crate) fn read_state(
    reader: &(impl KvReader + ?Sized),
    name: &str,
) -> NamespaceResult<Option<NamespaceState>> {
    match reader.get(&keys::encode_meta(name))? {
        None => Ok(None),
        Some(value) => NamespaceState::from_marker(&value)
            .map(Some)
            .ok_or_else(|| NamespaceError::Corrupt {
                name: name.to_string(),
            }),
    }
}

/// Namespace name stored in a meta key.
pub(crate) fn meta_name(key: &[u8]) -> NamespaceResult<String> {
    let corrupt = || NamespaceError::Corrupt {
        name: String::from_utf8_lossy(key).into_owned(),
    };
    let name = keys::decode_meta(key).ok_or_else(corrupt)?;
    String::from_utf8(name.to_vec()).map_err(|_| corrupt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Faults, FaultyStore};
    use gravel_kv::RedbStore;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    fn service() -> NamespaceService<RedbStore> {
        NamespaceService::new(RedbStore::open_in_memory().unwrap())
    }

    fn meta_value(svc: &NamespaceService<RedbStore>, name: &str) -> Option<Vec<u8>> {
        svc.store().get(&keys::encode_meta(name)).unwrap()
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    #[test]
    fn created_namespace_is_active() {
        let svc = service();
        svc.create_namespace("test_ns").unwrap();
        assert!(svc.is_active("test_ns").unwrap());
    }

    #[test]
    fn unknown_namespace_is_inactive() {
        let svc = service();
        assert!(!svc.is_active("test_ns").unwrap());
        assert_eq!(svc.namespace_state("test_ns").unwrap(), None);
    }

    #[test]
    fn create_twice_fails_without_touching_meta() {
        let svc = service();
        svc.create_namespace("test_ns").unwrap();
        let before = meta_value(&svc, "test_ns");

        let err = svc.create_namespace("test_ns").unwrap_err();
        assert!(matches!(err, NamespaceError::AlreadyExists));
        assert_eq!(meta_value(&svc, "test_ns"), before);
        assert_eq!(before, Some(b"EXISTS".to_vec()));
    }

    #[test]
    fn delete_tombstones_namespace() {
        let svc = service();
        svc.create_namespace("test_ns").unwrap();

        svc.delete_namespace("test_ns").unwrap();
        assert_eq!(meta_value(&svc, "test_ns"), Some(b"DELETING".to_vec()));
        assert!(!svc.is_active("test_ns").unwrap());

        let err = svc.delete_namespace("test_ns").unwrap_err();
        assert!(matches!(err, NamespaceError::Deleting));
    }

    #[test]
    fn delete_absent_namespace_is_not_found() {
        let svc = service();
        let err = svc.delete_namespace("test_ns").unwrap_err();
        assert!(matches!(err, NamespaceError::NotFound));
    }

    #[test]
    fn recreate_while_deleting_is_refused() {
        let svc = service();
        svc.create_namespace("test_ns").unwrap();
        svc.delete_namespace("test_ns").unwrap();

        let err = svc.create_namespace("test_ns").unwrap_err();
        assert!(matches!(err, NamespaceError::Deleting));
        assert_eq!(meta_value(&svc, "test_ns"), Some(b"DELETING".to_vec()));
    }

    #[test]
    fn corrupt_marker_is_reported() {
        let svc = service();
        svc.store().set(&keys::encode_meta("test_ns"), b"???").unwrap();

        assert!(matches!(
            svc.is_active("test_ns"),
            Err(NamespaceError::Corrupt { .. })
        ));
        assert!(matches!(
            svc.create_namespace("test_ns"),
            Err(NamespaceError::Corrupt { .. })
        ));
    }

    #[test]
    fn invalid_names_are_rejected_everywhere() {
        let svc = service();
        let name = "a/b";
        assert!(matches!(svc.create_namespace(name), Err(NamespaceError::InvalidName { .. })));
        assert!(matches!(svc.delete_namespace(name), Err(NamespaceError::InvalidName { .. })));
        assert!(matches!(svc.is_active(name), Err(NamespaceError::InvalidName { .. })));
        assert!(matches!(svc.get_key(name, "k"), Err(NamespaceError::InvalidName { .. })));
        assert!(matches!(svc.set_key(name, "k", b"v"), Err(NamespaceError::InvalidName { .. })));
        assert!(matches!(svc.delete_key(name, "k"), Err(NamespaceError::InvalidName { .. })));
    }

    #[test]
    fn list_namespaces_reports_states_in_order() {
        let svc = service();
        svc.create_namespace("beta").unwrap();
        svc.create_namespace("alpha").unwrap();
        svc.delete_namespace("beta").unwrap();
        // Data keys must not show up in the listing.
        svc.set_key("alpha", "k", b"DELETING").unwrap();

        let listed = svc.list_namespaces().unwrap();
        assert_eq!(
            listed,
            vec![
                NamespaceInfo {
                    name: "alpha".to_string(),
                    state: NamespaceState::Exists,
                },
                NamespaceInfo {
                    name: "beta".to_string(),
                    state: NamespaceState::Deleting,
                },
            ]
        );
    }

    // ── Key operations ─────────────────────────────────────────────

    #[test]
    fn set_then_get_round_trips() {
        let svc = service();
        svc.create_namespace("test_ns").unwrap();

        svc.set_key("test_ns", "greeting", b"hello").unwrap();
        assert_eq!(svc.get_key("test_ns", "greeting").unwrap(), b"hello".to_vec());

        svc.set_key("test_ns", "greeting", b"bye").unwrap();
        assert_eq!(svc.get_key("test_ns", "greeting").unwrap(), b"bye".to_vec());
    }

    #[test]
    fn delete_key_then_get_is_key_not_found() {
        let svc = service();
        svc.create_namespace("test_ns").unwrap();
        svc.set_key("test_ns", "k", b"v").unwrap();

        svc.delete_key("test_ns", "k").unwrap();
        assert!(matches!(
            svc.get_key("test_ns", "k"),
            Err(NamespaceError::KeyNotFound)
        ));
        // Idempotent.
        svc.delete_key("test_ns", "k").unwrap();
    }

    #[test]
    fn key_operations_on_unknown_namespace_fail() {
        let svc = service();
        assert!(matches!(svc.get_key("nope", "k"), Err(NamespaceError::NotFound)));
        assert!(matches!(svc.set_key("nope", "k", b"v"), Err(NamespaceError::NotFound)));
        assert!(matches!(svc.delete_key("nope", "k"), Err(NamespaceError::NotFound)));
    }

    #[test]
    fn key_operations_on_deleted_namespace_fail_even_with_data_present() {
        let svc = service();
        svc.create_namespace("test_ns").unwrap();
        svc.set_key("test_ns", "k", b"v").unwrap();
        svc.delete_namespace("test_ns").unwrap();

        // The physical key is still there until the collector runs.
        assert!(svc.store().has(&keys::encode_data("test_ns", "k")).unwrap());

        assert!(matches!(svc.get_key("test_ns", "k"), Err(NamespaceError::NotFound)));
        assert!(matches!(svc.set_key("test_ns", "k", b"w"), Err(NamespaceError::NotFound)));
        assert!(matches!(svc.delete_key("test_ns", "k"), Err(NamespaceError::NotFound)));
    }

    #[test]
    fn namespaces_do_not_see_each_other() {
        let svc = service();
        svc.create_namespace("a").unwrap();
        svc.create_namespace("ab").unwrap();
        svc.set_key("a", "bk", b"from-a").unwrap();

        assert!(matches!(svc.get_key("ab", "k"), Err(NamespaceError::KeyNotFound)));
        assert_eq!(svc.get_key("a", "bk").unwrap(), b"from-a".to_vec());
    }

    // ── Store failures ─────────────────────────────────────────────

    #[test]
    fn meta_read_failure_propagates() {
        let store = FaultyStore::new(Faults {
            get_key: Some(keys::encode_meta("test_ns")),
            ..Faults::default()
        });
        let svc = NamespaceService::new(store);

        assert!(matches!(svc.is_active("test_ns"), Err(NamespaceError::Store(_))));
        assert!(matches!(svc.create_namespace("test_ns"), Err(NamespaceError::Store(_))));
        assert!(matches!(svc.delete_namespace("test_ns"), Err(NamespaceError::Store(_))));
        assert!(matches!(svc.get_key("test_ns", "k"), Err(NamespaceError::Store(_))));
    }

    #[test]
    fn meta_write_failure_propagates() {
        let store = FaultyStore::new(Faults {
            set_key: Some(keys::encode_meta("test_ns")),
            ..Faults::default()
        });
        let svc = NamespaceService::new(store);

        assert!(matches!(svc.create_namespace("test_ns"), Err(NamespaceError::Store(_))));
        assert!(!svc.is_active("test_ns").unwrap());
    }

    #[test]
    fn data_write_failure_propagates() {
        let store = FaultyStore::new(Faults {
            set_key: Some(keys::encode_data("test_ns", "k")),
            delete_prefix: Some(keys::data_prefix("test_ns")),
            ..Faults::default()
        });
        let svc = NamespaceService::new(store);
        svc.create_namespace("test_ns").unwrap();

        assert!(matches!(svc.set_key("test_ns", "k", b"v"), Err(NamespaceError::Store(_))));
        assert!(matches!(svc.delete_key("test_ns", "k"), Err(NamespaceError::Store(_))));
    }

    // ── Logging ────────────────────────────────────────────────────

    /// Records, for every event, the names of the spans it was emitted in.
    #[derive(Clone, Default)]
    struct EventSpans(Arc<Mutex<Vec<Vec<&'static str>>>>);

    impl<S> Layer<S> for EventSpans
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
            let spans = ctx
                .event_scope(event)
                .map(|scope| scope.map(|span| span.name()).collect())
                .unwrap_or_default();
            self.0.lock().unwrap().push(spans);
        }
    }

    #[test]
    fn key_operations_log_under_service_span() {
        let store = RedbStore::open_in_memory().unwrap();
        let recorded = EventSpans::default();
        let subscriber = tracing_subscriber::registry().with(recorded.clone());

        tracing::subscriber::with_default(subscriber, || {
            let svc = NamespaceService::new(store).with_span(info_span!("tenant"));
            assert!(matches!(svc.get_key("ghost", "k"), Err(NamespaceError::NotFound)));
            assert!(matches!(svc.set_key("ghost", "k", b"v"), Err(NamespaceError::NotFound)));
            assert!(matches!(svc.delete_key("ghost", "k"), Err(NamespaceError::NotFound)));
        });

        let events = recorded.0.lock().unwrap();
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|spans| spans.contains(&"tenant")));
    }
}
