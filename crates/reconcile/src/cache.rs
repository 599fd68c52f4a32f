//! Existing-state cache
//!
//! Remote inventory is fetched lazily, once per kind per run. Each kind has
//! its own lock; holding a [`CacheSlot`] serialises every payload of that
//! kind while other kinds proceed.

use crate::kinds::REGISTRY;
use crate::types::{EntityKind, RemoteEntitySummary};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Inventory of one kind, shared read-only once fetched
pub type Snapshot = Arc<Vec<RemoteEntitySummary>>;

/// Per-run cache of remote inventory, keyed by kind
#[derive(Debug)]
pub struct ExistingStateCache {
    slots: Vec<Mutex<Option<Snapshot>>>,
}

impl Default for ExistingStateCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ExistingStateCache {
    /// Create an empty cache with one slot per kind
    pub fn new() -> Self {
        Self {
            slots: REGISTRY.iter().map(|_| Mutex::new(None)).collect(),
        }
    }

    /// Lock the slot for a kind until the returned guard is dropped
    pub fn lock(&self, kind: EntityKind) -> CacheSlot<'_> {
        CacheSlot {
            kind,
            guard: self.slots[kind.index()]
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Return the snapshot for a kind, fetching it if absent
    pub fn get<E, F>(&self, kind: EntityKind, fetch: F) -> Result<Snapshot, E>
    where
        F: FnOnce() -> Result<Vec<RemoteEntitySummary>, E>,
    {
        self.lock(kind).get_or_fetch(fetch)
    }

    /// Check if a kind has been fetched
    pub fn is_populated(&self, kind: EntityKind) -> bool {
        self.lock(kind).guard.is_some()
    }

    /// Cached snapshot for a kind, without fetching
    pub fn snapshot(&self, kind: EntityKind) -> Option<Snapshot> {
        self.lock(kind).guard.clone()
    }
}

/// Exclusive access to one kind's slot
pub struct CacheSlot<'a> {
    kind: EntityKind,
    guard: MutexGuard<'a, Option<Snapshot>>,
}

impl CacheSlot<'_> {
    /// Return the cached snapshot, or run `fetch` and store its result.
    ///
    /// A failed fetch leaves the slot empty.
    pub fn get_or_fetch<E, F>(&mut self, fetch: F) -> Result<Snapshot, E>
    where
        F: FnOnce() -> Result<Vec<RemoteEntitySummary>, E>,
    {
        if let Some(snapshot) = self.guard.as_ref() {
            return Ok(Arc::clone(snapshot));
        }

        let snapshot = Arc::new(fetch()?);
        log::debug!(
            "Cached {} existing {} object(s)",
            snapshot.len(),
            self.kind
        );
        *self.guard = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn tags() -> Vec<RemoteEntitySummary> {
        vec![RemoteEntitySummary::new("0", "Default")]
    }

    #[test]
    fn test_fetches_once() {
        let cache = ExistingStateCache::new();
        let calls = AtomicUsize::new(0);
        let fetch = || -> Result<_, String> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(tags())
        };

        assert_eq!(cache.get(EntityKind::ScopeTag, fetch).unwrap().len(), 1);
        assert_eq!(cache.get(EntityKind::ScopeTag, fetch).unwrap().len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_kinds_are_independent() {
        let cache = ExistingStateCache::new();
        cache
            .get(EntityKind::ScopeTag, || Ok::<_, String>(tags()))
            .unwrap();

        assert!(cache.is_populated(EntityKind::ScopeTag));
        assert!(!cache.is_populated(EntityKind::CompliancePolicy));
        assert!(cache.snapshot(EntityKind::CompliancePolicy).is_none());
    }

    #[test]
    fn test_failed_fetch_leaves_slot_empty() {
        let cache = ExistingStateCache::new();
        let err = cache
            .get(EntityKind::DeviceConfiguration, || {
                Err::<Vec<RemoteEntitySummary>, _>("unreachable tenant")
            })
            .unwrap_err();
        assert_eq!(err, "unreachable tenant");
        assert!(!cache.is_populated(EntityKind::DeviceConfiguration));

        let snapshot = cache
            .get(EntityKind::DeviceConfiguration, || {
                Ok::<_, &str>(vec![RemoteEntitySummary::new("B", "Baseline")])
            })
            .unwrap();
        assert_eq!(snapshot[0].id, "B");
    }

    #[test]
    fn test_empty_inventory_is_cached() {
        let cache = ExistingStateCache::new();
        cache
            .get(EntityKind::ManagementScript, || Ok::<_, String>(Vec::new()))
            .unwrap();
        assert!(cache.is_populated(EntityKind::ManagementScript));
    }

    #[test]
    fn test_concurrent_callers_fetch_once() {
        let cache = ExistingStateCache::new();
        let calls = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    cache
                        .get(EntityKind::CompliancePolicy, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, String>(tags())
                        })
                        .unwrap();
                });
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
