//! # Reconcile
//!
//! Engine for importing exported device-management configuration objects
//! into a tenant.
//!
//! Each incoming JSON document is classified into an [`EntityKind`], compared
//! against the objects that already exist remotely, and then created, patched
//! or skipped according to an [`OverwritePolicy`].
//!
//! ## Core Concepts
//!
//! - **Kind registry**: one row per kind with its classifier, collection path
//!   and resend strategy ([`kinds::REGISTRY`])
//! - **Existing-state cache**: remote inventory fetched once per kind per run
//! - **Decision**: pure function of policy, incoming identity and inventory
//! - **Reconciler**: ties the above to a [`TenantApi`] and a
//!   [`NotificationSink`]
//!
//! ## Example
//!
//! ```
//! use reconcile::{
//!     CollectNotify, ImportDecision, MockTenant, OverwritePolicy, Reconciler,
//! };
//!
//! let tenant = MockTenant::new();
//! let reconciler = Reconciler::new(&tenant, CollectNotify::new(), OverwritePolicy::Discard);
//!
//! let outcome = reconciler.import_json(
//!     r##"{"@odata.type":"#microsoft.graph.windows10GeneralConfiguration","id":"A","displayName":"Baseline"}"##,
//! )?;
//!
//! assert_eq!(outcome.decision, ImportDecision::Create);
//! assert_eq!(tenant.created().len(), 1);
//! # Ok::<(), reconcile::Error>(())
//! ```
//!
//! ## Provider Traits
//!
//! - [`TenantApi`]: lists, creates and patches remote objects
//! - [`NotificationSink`]: receives skip messages
//! - [`BatchProgress`]: receives per-payload completion in batch imports

pub mod cache;
pub mod classify;
pub mod context;
pub mod decide;
pub mod error;
pub mod kinds;
pub mod payload;
pub mod reconciler;
pub mod remote;
pub mod types;

pub use cache::{ExistingStateCache, Snapshot};
pub use classify::{classify, classify_spec};
pub use context::{CollectNotify, LogNotify, NoNotify, NotificationSink};
pub use decide::{decide, decide_scope_tag};
pub use error::{Error, Result};
pub use kinds::{KindSpec, REGISTRY, Resend};
pub use payload::ConfigurationPayload;
pub use reconciler::{BatchProgress, NoProgress, Reconciler};
pub use remote::{DryRunTenant, MockTenant, RecordedCall, TenantApi};
pub use types::{
    EntityKind, ImportDecision, ImportOutcome, ImportSummary, OverwritePolicy,
    RemoteEntitySummary, SkipReason, WipFlavor,
};
