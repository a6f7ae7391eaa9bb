//! The `run` use case: resolve configuration, evaluate one script, and produce a receipt.

use crate::backend::ScriptBackend;
use crate::delegating::DelegatingBackend;
use crate::error::RunError;
use crate::facts::collect_facts;
use crate::in_process::InProcessBackend;
use crate::interpreter::Interpreter;
use crate::receipt::build_receipt;
use crate::script::parse_script;
use crate::state::ScriptRunState;
use anyhow::Context;
use camino::Utf8Path;
use enact_settings::{BackendKind, Overrides, ResolvedConfig};
use enact_types::{RunOptions, RunReceipt};
use time::OffsetDateTime;

/// Input for the run use case.
#[derive(Clone, Debug)]
pub struct RunInput<'a> {
    /// Script to evaluate.
    pub script_path: &'a Utf8Path,
    /// Further positional arguments; they are ignored with a warning.
    pub extra_args: &'a [String],
    /// Config file contents (empty string if not found).
    pub config_text: &'a str,
    /// CLI overrides.
    pub overrides: Overrides,
}

/// Output from the run use case.
#[derive(Debug)]
pub struct RunOutput {
    pub outcome: RunOutcome,
    pub receipt: RunReceipt,
    pub resolved_config: ResolvedConfig,
}

/// Why evaluation stopped before the end of the script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Abort {
    /// A resource or code block failed with keep-going off.
    EnforcementFailed(String),
    /// The script could not be evaluated. The message is also in the failure ledger.
    EvaluationFault(String),
}

impl Abort {
    pub fn message(&self) -> &str {
        match self {
            Abort::EnforcementFailed(m) | Abort::EvaluationFault(m) => m,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunOutcome {
    pub state: ScriptRunState,
    pub abort: Option<Abort>,
    pub started_at: OffsetDateTime,
    pub finished_at: OffsetDateTime,
}

impl RunOutcome {
    pub fn summary_line(&self) -> String {
        self.state.summary_line()
    }

    pub fn exit_code(&self) -> i32 {
        exit_code_for(self.state.failure_count())
    }
}

/// Process exit code for a failure count: the count itself, capped at 255.
pub fn exit_code_for(failures: usize) -> i32 {
    failures.min(255) as i32
}

/// Backend for the resolved configuration.
pub fn build_backend(resolved: &ResolvedConfig) -> Box<dyn ScriptBackend> {
    match resolved.backend {
        BackendKind::InProcess => Box::new(InProcessBackend::new(resolved.node_name.clone())),
        BackendKind::Delegating => Box::new(DelegatingBackend::new(resolved.enforcer.clone())),
    }
}

/// Run the use case end to end with the backend named by the configuration.
pub fn run_script(input: RunInput<'_>) -> anyhow::Result<RunOutput> {
    // Parse config (empty is allowed, defaults apply).
    let cfg = if input.config_text.trim().is_empty() {
        enact_settings::EnactConfigV1::default()
    } else {
        enact_settings::parse_config_toml(input.config_text).context("parse config")?
    };
    let resolved = enact_settings::resolve_config(cfg, input.overrides.clone())
        .context("resolve config")?;

    let mut backend = build_backend(&resolved);
    let outcome = execute_script(
        input.script_path,
        input.extra_args,
        resolved.options,
        backend.as_mut(),
    )?;

    let receipt = build_receipt(&outcome, input.script_path, resolved.backend, resolved.options);
    Ok(RunOutput {
        outcome,
        receipt,
        resolved_config: resolved,
    })
}

/// Evaluate one script against `backend`.
///
/// Only a missing script is an `Err`; everything that goes wrong once evaluation has started is
/// described by the returned outcome.
pub fn execute_script(
    script_path: &Utf8Path,
    extra_args: &[String],
    options: RunOptions,
    backend: &mut dyn ScriptBackend,
) -> Result<RunOutcome, RunError> {
    if !script_path.exists() {
        return Err(RunError::ScriptNotFound {
            path: script_path.to_string(),
        });
    }
    let started_at = OffsetDateTime::now_utc();

    if !extra_args.is_empty() {
        tracing::warn!(
            "Only one script will be executed per run. Skipping {}",
            extra_args.join(", ")
        );
    }

    let facts = collect_facts(script_path);
    let mut interpreter = Interpreter::new(backend, options, facts);

    let evaluated = std::fs::read_to_string(script_path)
        .map_err(|e| RunError::fault(format!("Could not read script {script_path}: {e}")))
        .and_then(|text| parse_script(&text).map_err(|e| RunError::fault(e.to_string())))
        .and_then(|script| interpreter.evaluate(&script));

    let mut state = interpreter.into_state();
    let abort = match evaluated {
        Ok(()) => None,
        Err(RunError::ResourceEnforcementFailed { message }) => {
            Some(Abort::EnforcementFailed(message))
        }
        Err(RunError::ScriptEvaluationFault { message }) => {
            state.record_failure(message.clone());
            Some(Abort::EvaluationFault(message))
        }
        Err(err @ RunError::ScriptNotFound { .. }) => return Err(err),
    };
    if let Some(abort) = &abort {
        tracing::debug!(reason = abort.message(), "evaluation stopped early");
    }

    Ok(RunOutcome {
        state,
        abort,
        started_at,
        finished_at: OffsetDateTime::now_utc(),
    })
}
