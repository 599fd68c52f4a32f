//! Import reconciliation
//!
//! A [`Reconciler`] owns everything one import run needs: the tenant API,
//! the notification sink, the overwrite policy and the existing-state cache.
//! Nothing is shared between runs.

use crate::cache::ExistingStateCache;
use crate::classify::classify_spec;
use crate::context::NotificationSink;
use crate::decide::{decide, decide_scope_tag};
use crate::error::Result;
use crate::kinds::{EntityHook, KindSpec, Resend, TypedEntity};
use crate::payload::ConfigurationPayload;
use crate::remote::TenantApi;
use crate::types::{EntityKind, ImportDecision, ImportOutcome, OverwritePolicy, RemoteEntitySummary};
use anyhow::Context as _;
use rayon::prelude::*;
use serde_json::Value;

/// Progress callback for batch imports.
///
/// Called from worker threads when `jobs > 1`.
pub trait BatchProgress: Sync {
    /// Called when a payload finishes, successfully or not
    fn on_payload_complete(&self, index: usize, result: &Result<ImportOutcome>);
}

/// No-op progress
pub struct NoProgress;

impl BatchProgress for NoProgress {
    fn on_payload_complete(&self, _index: usize, _result: &Result<ImportOutcome>) {}
}

/// Reconciles exported configuration objects against a remote tenant
pub struct Reconciler<A, N> {
    api: A,
    notify: N,
    policy: OverwritePolicy,
    cache: ExistingStateCache,
}

impl<A: TenantApi, N: NotificationSink> Reconciler<A, N> {
    /// Create a reconciler for one run
    pub fn new(api: A, notify: N, policy: OverwritePolicy) -> Self {
        Self {
            api,
            notify,
            policy,
            cache: ExistingStateCache::new(),
        }
    }

    pub fn policy(&self) -> OverwritePolicy {
        self.policy
    }

    /// Remote inventory cached so far
    pub fn cache(&self) -> &ExistingStateCache {
        &self.cache
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Parse and import one JSON document
    pub fn import_json(&self, text: &str) -> Result<ImportOutcome> {
        let payload = ConfigurationPayload::parse(text)?;
        self.import(&payload)
    }

    /// Import one payload.
    ///
    /// Skips are successful outcomes. Errors are returned for unsupported or
    /// malformed payloads and for remote failures.
    pub fn import(&self, payload: &ConfigurationPayload) -> Result<ImportOutcome> {
        let spec = classify_spec(payload.discriminator())?;
        let outgoing = Outgoing::new(spec, payload)?;
        log::debug!(
            "Classified '{}' as {}",
            payload.display_name().unwrap_or_default(),
            spec.kind
        );

        if spec.kind != EntityKind::ScopeTag && !self.policy.consults_inventory() {
            return self.execute(spec, payload, ImportDecision::Create, outgoing);
        }

        // Held until the write completes so payloads of one kind never interleave
        let mut slot = self.cache.lock(spec.kind);
        let existing = slot.get_or_fetch(|| self.fetch(spec.kind))?;

        let decision = if spec.kind == EntityKind::ScopeTag {
            decide_scope_tag(payload.display_name(), payload.is_built_in(), &existing)
        } else {
            decide(
                self.policy,
                payload.id(),
                payload.display_name(),
                &existing,
            )
        };
        log::debug!("Decision for {}: {:?}", spec.kind, decision);

        let outcome = self.execute(spec, payload, decision, outgoing);
        drop(slot);
        outcome
    }

    /// Import many payloads on up to `jobs` threads.
    ///
    /// Results are returned in input order.
    pub fn import_batch(
        &self,
        payloads: &[ConfigurationPayload],
        jobs: usize,
    ) -> Vec<Result<ImportOutcome>> {
        self.import_batch_with_progress(payloads, jobs, &NoProgress)
    }

    /// [`Reconciler::import_batch`] with a progress callback
    pub fn import_batch_with_progress<P: BatchProgress>(
        &self,
        payloads: &[ConfigurationPayload],
        jobs: usize,
        progress: &P,
    ) -> Vec<Result<ImportOutcome>> {
        let run = |(index, payload): (usize, &ConfigurationPayload)| {
            let result = self.import(payload);
            progress.on_payload_complete(index, &result);
            result
        };

        if jobs <= 1 || payloads.len() <= 1 {
            return payloads.iter().enumerate().map(run).collect();
        }

        match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
            Ok(pool) => pool.install(|| payloads.par_iter().enumerate().map(run).collect()),
            Err(e) => {
                log::warn!("Failed to create thread pool, importing sequentially: {}", e);
                payloads.iter().enumerate().map(run).collect()
            }
        }
    }

    fn fetch(&self, kind: EntityKind) -> anyhow::Result<Vec<RemoteEntitySummary>> {
        log::debug!("Fetching existing {} objects", kind);
        self.api
            .fetch_all(kind)
            .with_context(|| format!("Failed to list existing {} objects", kind.label()))
    }

    fn execute(
        &self,
        spec: &KindSpec,
        payload: &ConfigurationPayload,
        decision: ImportDecision,
        outgoing: Outgoing,
    ) -> Result<ImportOutcome> {
        let kind = spec.kind;
        let name = payload.display_name().unwrap_or_default();
        let mut created_id = None;

        match &decision {
            ImportDecision::Create => {
                let body = outgoing.into_body(&decision)?;
                let created = self
                    .api
                    .create(kind, &body)
                    .with_context(|| format!("Failed to create {} '{}'", spec.label, name))?;
                created_id = created.get("id").and_then(Value::as_str).map(String::from);
                log::info!("Created {} '{}'", spec.label, name);
            }
            ImportDecision::PatchById(target) | ImportDecision::PatchByName(target) => {
                let body = outgoing.into_body(&decision)?;
                self.api
                    .patch(kind, target, &body)
                    .with_context(|| format!("Failed to update {} '{}' ({})", spec.label, name, target))?;
                log::info!("Updated {} '{}' ({})", spec.label, name, target);
            }
            ImportDecision::Skip(reason) => {
                self.notify
                    .notify(&reason.message(name, payload.id().unwrap_or_default()));
            }
        }

        Ok(ImportOutcome {
            kind,
            display_name: payload.display_name().map(String::from),
            source_id: payload.id().map(String::from),
            decision,
            created_id,
        })
    }
}

/// Write body under construction, per the kind's resend strategy
enum Outgoing {
    Typed {
        entity: TypedEntity,
        prepare_create: EntityHook,
        prepare_update: EntityHook,
    },
    Raw(Value),
}

impl Outgoing {
    fn new(spec: &KindSpec, payload: &ConfigurationPayload) -> Result<Self> {
        Ok(match spec.resend {
            Resend::Typed {
                sanitize,
                prepare_create,
                prepare_update,
            } => {
                let mut entity = TypedEntity::from_payload(payload)?;
                sanitize(&mut entity);
                Self::Typed {
                    entity,
                    prepare_create,
                    prepare_update,
                }
            }
            Resend::Raw => Self::Raw(payload.to_value()),
        })
    }

    fn into_body(self, decision: &ImportDecision) -> Result<Value> {
        match self {
            Self::Typed {
                mut entity,
                prepare_create,
                prepare_update,
            } => {
                match decision {
                    ImportDecision::Create => prepare_create(&mut entity),
                    ImportDecision::PatchById(_) => prepare_update(&mut entity),
                    ImportDecision::PatchByName(target) => {
                        prepare_update(&mut entity);
                        entity.id = Some(target.clone());
                    }
                    ImportDecision::Skip(_) => {}
                }
                entity.to_value()
            }
            Self::Raw(mut value) => {
                if let (ImportDecision::PatchByName(target), Value::Object(map)) =
                    (decision, &mut value)
                {
                    map.insert("id".to_string(), Value::String(target.clone()));
                }
                Ok(value)
            }
        }
    }
}
