//! # graphkit
//!
//! Blocking client for the device-management collections of the Graph API.
//!
//! This crate provides:
//! - Cloud endpoint selection (global, US Government, China)
//! - Bearer-token requests with JSON bodies
//! - Collection paging via `@odata.nextLink`
//! - Retry with exponential backoff on throttling and gateway errors,
//!   honoring `Retry-After`
//! - A [`reconcile::TenantApi`] implementation, so a [`GraphClient`] can
//!   drive a [`reconcile::Reconciler`] directly
//!
//! ## Example
//!
//! ```no_run
//! use graphkit::{Cloud, GraphClient, GraphConfig};
//! use reconcile::{LogNotify, OverwritePolicy, Reconciler};
//!
//! let config = GraphConfig { cloud: Cloud::Global, ..Default::default() };
//! let client = GraphClient::new(&config, std::env::var("GRAPH_TOKEN").unwrap()).unwrap();
//!
//! let reconciler = Reconciler::new(client, LogNotify, OverwritePolicy::Discard);
//! let outcome = reconciler
//!     .import_json(r##"{"@odata.type":"#microsoft.graph.roleScopeTag","displayName":"Corporate","isBuiltIn":false}"##)
//!     .unwrap();
//! println!("{:?}", outcome.decision);
//! ```

pub mod client;
pub mod error;
pub mod retry;
pub mod types;

pub use client::GraphClient;
pub use error::{Error, ErrorCategory, Result};
pub use retry::{LogCallback, RetryCallback, with_retry};
pub use types::{Cloud, GraphConfig, ODataPage, RetryConfig};
