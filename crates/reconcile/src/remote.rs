//! Remote tenant API seam
//!
//! The engine only needs three operations per kind. Transport, auth and
//! retries belong to the implementation.
//!
//! # Testing
//!
//! Use [`MockTenant`] to run the engine without network access:
//!
//! ```
//! use reconcile::{EntityKind, MockTenant, RemoteEntitySummary, TenantApi};
//!
//! let tenant = MockTenant::new();
//! tenant.set_existing(
//!     EntityKind::ScopeTag,
//!     vec![RemoteEntitySummary::new("0", "Default")],
//! );
//!
//! let tags = tenant.fetch_all(EntityKind::ScopeTag).unwrap();
//! assert_eq!(tags.len(), 1);
//! ```

use crate::types::{EntityKind, RemoteEntitySummary};
use anyhow::{Result, bail};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Operations the engine performs against the remote tenant
pub trait TenantApi: Send + Sync {
    /// List every object of a kind
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<RemoteEntitySummary>>;

    /// Create an object, returning it as stored remotely
    fn create(&self, kind: EntityKind, body: &Value) -> Result<Value>;

    /// Patch the object with the given id
    fn patch(&self, kind: EntityKind, id: &str, body: &Value) -> Result<()>;
}

impl<T: TenantApi + ?Sized> TenantApi for &T {
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<RemoteEntitySummary>> {
        (**self).fetch_all(kind)
    }

    fn create(&self, kind: EntityKind, body: &Value) -> Result<Value> {
        (**self).create(kind, body)
    }

    fn patch(&self, kind: EntityKind, id: &str, body: &Value) -> Result<()> {
        (**self).patch(kind, id, body)
    }
}

/// A call recorded by [`MockTenant`]
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    FetchAll(EntityKind),
    Create(EntityKind, Value),
    Patch(EntityKind, String, Value),
}

/// In-memory tenant for tests and dry runs.
///
/// Writes are recorded, not applied: the inventory returned by
/// [`TenantApi::fetch_all`] only changes through [`MockTenant::set_existing`].
#[derive(Debug, Clone, Default)]
pub struct MockTenant {
    existing: Arc<Mutex<HashMap<EntityKind, Vec<RemoteEntitySummary>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failing: Arc<Mutex<HashSet<EntityKind>>>,
    next_id: Arc<AtomicU64>,
}

impl MockTenant {
    /// Create an empty tenant
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inventory returned for a kind
    pub fn set_existing(&self, kind: EntityKind, objects: Vec<RemoteEntitySummary>) {
        lock(&self.existing).insert(kind, objects);
    }

    /// Builder form of [`MockTenant::set_existing`]
    pub fn with_existing(self, kind: EntityKind, objects: Vec<RemoteEntitySummary>) -> Self {
        self.set_existing(kind, objects);
        self
    }

    /// Make every operation on a kind fail
    pub fn fail_kind(&self, kind: EntityKind) {
        lock(&self.failing).insert(kind);
    }

    /// Let operations on a kind succeed again
    pub fn recover_kind(&self, kind: EntityKind) {
        lock(&self.failing).remove(&kind);
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.calls).clone()
    }

    /// Number of inventory fetches made for a kind
    pub fn fetch_count(&self, kind: EntityKind) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, RecordedCall::FetchAll(k) if *k == kind))
            .count()
    }

    /// Bodies sent to `create`, in order
    pub fn created(&self) -> Vec<(EntityKind, Value)> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Create(kind, body) => Some((*kind, body.clone())),
                _ => None,
            })
            .collect()
    }

    /// Targets and bodies sent to `patch`, in order
    pub fn patched(&self) -> Vec<(EntityKind, String, Value)> {
        lock(&self.calls)
            .iter()
            .filter_map(|c| match c {
                RecordedCall::Patch(kind, id, body) => Some((*kind, id.clone(), body.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of writes (creates and patches)
    pub fn write_count(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| !matches!(c, RecordedCall::FetchAll(_)))
            .count()
    }

    fn check(&self, kind: EntityKind, operation: &str) -> Result<()> {
        if lock(&self.failing).contains(&kind) {
            bail!("mock {} failed for {}", operation, kind);
        }
        Ok(())
    }

    fn record(&self, call: RecordedCall) {
        lock(&self.calls).push(call);
    }
}

impl TenantApi for MockTenant {
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<RemoteEntitySummary>> {
        self.record(RecordedCall::FetchAll(kind));
        self.check(kind, "fetch")?;
        Ok(lock(&self.existing).get(&kind).cloned().unwrap_or_default())
    }

    fn create(&self, kind: EntityKind, body: &Value) -> Result<Value> {
        self.record(RecordedCall::Create(kind, body.clone()));
        self.check(kind, "create")?;

        let mut created = body.clone();
        if let Value::Object(map) = &mut created {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            map.insert("id".to_string(), Value::String(format!("mock-{}", id)));
        }
        Ok(created)
    }

    fn patch(&self, kind: EntityKind, id: &str, body: &Value) -> Result<()> {
        self.record(RecordedCall::Patch(kind, id.to_string(), body.clone()));
        self.check(kind, "patch")
    }
}

/// Wrapper that reads inventory from the inner tenant but only records
/// writes.
pub struct DryRunTenant<A> {
    inner: A,
    writes: Mutex<Vec<RecordedCall>>,
}

impl<A: TenantApi> DryRunTenant<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Writes that would have been sent, in order
    pub fn writes(&self) -> Vec<RecordedCall> {
        lock(&self.writes).clone()
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

impl<A: TenantApi> TenantApi for DryRunTenant<A> {
    fn fetch_all(&self, kind: EntityKind) -> Result<Vec<RemoteEntitySummary>> {
        self.inner.fetch_all(kind)
    }

    fn create(&self, kind: EntityKind, body: &Value) -> Result<Value> {
        log::info!("[dry-run] would create {} object", kind);
        lock(&self.writes).push(RecordedCall::Create(kind, body.clone()));
        Ok(body.clone())
    }

    fn patch(&self, kind: EntityKind, id: &str, body: &Value) -> Result<()> {
        log::info!("[dry-run] would update {} object {}", kind, id);
        lock(&self.writes).push(RecordedCall::Patch(kind, id.to_string(), body.clone()));
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mock_empty_inventory() {
        let tenant = MockTenant::new();
        assert!(tenant.fetch_all(EntityKind::CompliancePolicy).unwrap().is_empty());
        assert_eq!(tenant.fetch_count(EntityKind::CompliancePolicy), 1);
    }

    #[test]
    fn test_mock_create_assigns_id() {
        let tenant = MockTenant::new();
        let created = tenant
            .create(EntityKind::ScopeTag, &json!({"displayName": "Corporate"}))
            .unwrap();
        assert_eq!(created["id"], "mock-1");
        assert_eq!(tenant.created().len(), 1);
        assert_eq!(tenant.write_count(), 1);
    }

    #[test]
    fn test_mock_patch_recorded() {
        let tenant = MockTenant::new();
        tenant
            .patch(EntityKind::DeviceConfiguration, "B", &json!({"id": "B"}))
            .unwrap();
        assert_eq!(
            tenant.patched(),
            vec![(EntityKind::DeviceConfiguration, "B".to_string(), json!({"id": "B"}))]
        );
    }

    #[test]
    fn test_mock_failure_injection() {
        let tenant = MockTenant::new();
        tenant.fail_kind(EntityKind::ScopeTag);
        assert!(tenant.fetch_all(EntityKind::ScopeTag).is_err());
        assert!(tenant.fetch_all(EntityKind::CompliancePolicy).is_ok());

        tenant.recover_kind(EntityKind::ScopeTag);
        assert!(tenant.fetch_all(EntityKind::ScopeTag).is_ok());
    }

    #[test]
    fn test_dry_run_reads_but_does_not_write() {
        let tenant = MockTenant::new().with_existing(
            EntityKind::ScopeTag,
            vec![RemoteEntitySummary::new("0", "Default")],
        );
        let dry = DryRunTenant::new(&tenant);

        assert_eq!(dry.fetch_all(EntityKind::ScopeTag).unwrap().len(), 1);
        let body = json!({"displayName": "Corporate"});
        assert_eq!(dry.create(EntityKind::ScopeTag, &body).unwrap(), body);
        dry.patch(EntityKind::ScopeTag, "3", &body).unwrap();

        assert_eq!(dry.writes().len(), 2);
        assert_eq!(tenant.fetch_count(EntityKind::ScopeTag), 1);
        assert_eq!(tenant.write_count(), 0);
    }

    #[test]
    fn test_mock_clones_share_state() {
        let tenant = MockTenant::new();
        let clone = tenant.clone();
        clone.set_existing(
            EntityKind::ScopeTag,
            vec![RemoteEntitySummary::new("0", "Default")],
        );
        assert_eq!(tenant.fetch_all(EntityKind::ScopeTag).unwrap().len(), 1);
    }
}
