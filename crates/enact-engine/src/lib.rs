//! Reference in-process enforcement engine.
//!
//! Input: declarative manifest text or single resources.
//! Output: a transaction report with per-resource statuses and events.
//!
//! The interpreter only talks to this crate through [`ResourceStore`], [`Catalog`], and
//! [`Transaction`]; providers are pluggable via [`Providers`].

#![forbid(unsafe_code)]

pub mod catalog;
pub mod manifest;
pub mod model;
pub mod providers;
pub mod report;
pub mod store;
pub mod transaction;

pub use catalog::{Catalog, CompileError};
pub use manifest::{ManifestError, parse_manifest, render_resource};
pub use model::Resource;
pub use providers::{Provider, Providers};
pub use report::{Event, EventStatus, ResourceStatus, TransactionReport};
pub use store::{LocalStore, ResourceStore, SaveResult, StoreError};
pub use transaction::{Transaction, TransactionError};
