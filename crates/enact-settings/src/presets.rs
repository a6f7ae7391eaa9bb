use crate::resolve::{BackendKind, EnforcerCommand, ResolvedConfig};
use enact_types::{RunOptions, ids};

pub const DEFAULT_ENFORCER_PROGRAM: &str = "puppet";
pub const DEFAULT_ENFORCER_ARGS: &[&str] = &["apply", "--execute"];

/// Defaults applied before the config file and CLI overrides.
pub fn defaults() -> ResolvedConfig {
    ResolvedConfig {
        options: RunOptions::default(),
        backend: BackendKind::InProcess,
        enforcer: EnforcerCommand {
            program: DEFAULT_ENFORCER_PROGRAM.to_string(),
            args: DEFAULT_ENFORCER_ARGS.iter().map(|a| a.to_string()).collect(),
        },
        node_name: ids::DEFAULT_NODE_NAME.to_string(),
    }
}
