use crate::{model::EnactConfigV1, presets};
use enact_types::{RunOptions, ids};
use std::fmt;

/// CLI-level overrides. `None` leaves the config file (or default) value in place.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub debug: Option<bool>,
    pub keep_going: Option<bool>,
    pub verbose: Option<bool>,
    pub backend: Option<String>,
    pub node_name: Option<String>,
    pub enforcer_program: Option<String>,
    pub enforcer_args: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    InProcess,
    Delegating,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::InProcess => ids::BACKEND_IN_PROCESS,
            BackendKind::Delegating => ids::BACKEND_DELEGATING,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External command the delegating backend invokes; code is appended as the last argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnforcerCommand {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub options: RunOptions,
    pub backend: BackendKind,
    pub enforcer: EnforcerCommand,
    pub node_name: String,
}

pub fn resolve_config(cfg: EnactConfigV1, overrides: Overrides) -> anyhow::Result<ResolvedConfig> {
    let mut resolved = presets::defaults();

    resolved.options = RunOptions {
        debug: overrides.debug.or(cfg.debug).unwrap_or(false),
        keep_going: overrides.keep_going.or(cfg.keep_going).unwrap_or(false),
        verbose: overrides.verbose.or(cfg.verbose).unwrap_or(false),
    };

    if let Some(backend) = overrides.backend.or(cfg.backend) {
        resolved.backend = parse_backend(&backend)?;
    }

    if let Some(node_name) = overrides.node_name.or(cfg.node_name) {
        if node_name.trim().is_empty() {
            anyhow::bail!("node_name must not be empty");
        }
        resolved.node_name = node_name;
    }

    let enforcer = cfg.enforcer.unwrap_or_default();
    if let Some(program) = overrides.enforcer_program.or(enforcer.program) {
        if program.trim().is_empty() {
            anyhow::bail!("enforcer program must not be empty");
        }
        resolved.enforcer.program = program;
    }
    if let Some(args) = overrides.enforcer_args.or(enforcer.args) {
        resolved.enforcer.args = args;
    }

    Ok(resolved)
}

fn parse_backend(v: &str) -> anyhow::Result<BackendKind> {
    match v {
        "in-process" | "in_process" | "local" => Ok(BackendKind::InProcess),
        "delegating" | "external" => Ok(BackendKind::Delegating),
        other => anyhow::bail!("unknown backend: {other} (expected 'in-process' or 'delegating')"),
    }
}
