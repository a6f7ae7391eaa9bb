//! Assembly of the machine-readable run receipt.

use crate::run::{Abort, RunOutcome};
use anyhow::Context;
use camino::Utf8Path;
use enact_settings::BackendKind;
use enact_types::{RunMeta, RunOptions, RunReceipt, RunSummary, SCHEMA_RUN_V1, ToolMeta};

pub fn build_receipt(
    outcome: &RunOutcome,
    script_path: &Utf8Path,
    backend: BackendKind,
    options: RunOptions,
) -> RunReceipt {
    let duration_ms = (outcome.finished_at - outcome.started_at)
        .whole_milliseconds()
        .max(0) as u64;

    RunReceipt {
        schema: SCHEMA_RUN_V1.to_string(),
        tool: ToolMeta {
            name: "enact".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        run: RunMeta {
            started_at: outcome.started_at,
            ended_at: outcome.finished_at,
            duration_ms,
        },
        script: script_path.to_string(),
        backend: backend.as_str().to_string(),
        options,
        managed: outcome
            .state
            .enforced()
            .iter()
            .map(|r| r.reference.display_ref())
            .collect(),
        failures: outcome.state.errors().to_vec(),
        aborted: outcome.abort.as_ref().map(Abort::message).map(str::to_string),
        summary: RunSummary {
            managed: u32::try_from(outcome.state.managed_count()).unwrap_or(u32::MAX),
            failures: u32::try_from(outcome.state.failure_count()).unwrap_or(u32::MAX),
        },
        exit_code: outcome.exit_code(),
    }
}

pub fn serialize_receipt(receipt: &RunReceipt) -> anyhow::Result<Vec<u8>> {
    serde_json::to_vec_pretty(receipt).context("serialize run receipt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ScriptRunState;
    use enact_types::{EnforcedResource, ParameterSet, ResourceRef};
    use time::macros::datetime;

    #[test]
    fn receipt_mirrors_the_outcome() {
        let mut state = ScriptRunState::new();
        state.record_enforced(EnforcedResource::new(
            ResourceRef::new("file", "/etc/motd"),
            ParameterSet::new(),
        ));
        state.record_failure("Failed enforcing Notify[x]");
        let outcome = RunOutcome {
            state,
            abort: Some(Abort::EnforcementFailed(
                "Failed enforcing Notify[x]".to_string(),
            )),
            started_at: datetime!(2026-01-01 0:00 UTC),
            finished_at: datetime!(2026-01-01 0:00:01.5 UTC),
        };

        let receipt = build_receipt(
            &outcome,
            Utf8Path::new("site.toml"),
            BackendKind::Delegating,
            RunOptions::default(),
        );

        assert_eq!(receipt.schema, "enact.run.v1");
        assert_eq!(receipt.run.duration_ms, 1500);
        assert_eq!(receipt.backend, "delegating");
        assert_eq!(receipt.managed, ["File[/etc/motd]"]);
        assert_eq!(receipt.summary, RunSummary { managed: 1, failures: 1 });
        assert_eq!(receipt.exit_code, 1);
        assert_eq!(receipt.aborted.as_deref(), Some("Failed enforcing Notify[x]"));

        let json: serde_json::Value =
            serde_json::from_slice(&serialize_receipt(&receipt).expect("serialize"))
                .expect("parse json");
        assert_eq!(json["run"]["started_at"], "2026-01-01T00:00:00Z");
    }
}
