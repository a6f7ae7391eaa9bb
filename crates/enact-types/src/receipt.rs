use crate::RunOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Stable schema identifier for the run receipt.
pub const SCHEMA_RUN_V1: &str = "enact.run.v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ToolMeta {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunMeta {
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[schemars(with = "String")]
    #[serde(with = "time::serde::rfc3339")]
    pub ended_at: OffsetDateTime,
    pub duration_ms: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunSummary {
    pub managed: u32,
    pub failures: u32,
}

/// Machine-readable record of one script run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunReceipt {
    pub schema: String,
    pub tool: ToolMeta,
    pub run: RunMeta,
    /// Script path as given on the command line.
    pub script: String,
    /// `in-process` or `delegating`.
    pub backend: String,
    pub options: RunOptions,
    /// Display references of every managed resource, in enforcement order.
    pub managed: Vec<String>,
    /// Recorded failure messages, in script order.
    pub failures: Vec<String>,
    /// Message of the failure that stopped evaluation early, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    pub summary: RunSummary,
    pub exit_code: i32,
}
