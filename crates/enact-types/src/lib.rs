//! Stable DTOs and IDs used across the enact workspace.
//!
//! This crate is intentionally boring:
//! - resource references and their two canonical string forms
//! - parameter sets passed verbatim to backends
//! - run options shared by every enforcement call
//! - the JSON run receipt and its schema id

#![forbid(unsafe_code)]

pub mod ids;
pub mod options;
pub mod receipt;
pub mod resource;

pub use options::RunOptions;
pub use receipt::{RunMeta, RunReceipt, RunSummary, SCHEMA_RUN_V1, ToolMeta};
pub use resource::{EnforcedResource, ParameterSet, ResourceRef};
