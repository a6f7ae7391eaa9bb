//! Config parsing and option resolution.
//!
//! This crate is intentionally IO-free: it parses and resolves configuration provided as strings.

#![forbid(unsafe_code)]

mod model;
mod presets;
mod resolve;

pub use model::{EnactConfigV1, EnforcerConfig};
pub use presets::{DEFAULT_ENFORCER_ARGS, DEFAULT_ENFORCER_PROGRAM};
pub use resolve::{BackendKind, EnforcerCommand, Overrides, ResolvedConfig};

/// Parse `enact.toml` (or equivalent) into a typed model.
pub fn parse_config_toml(input: &str) -> anyhow::Result<EnactConfigV1> {
    let cfg: EnactConfigV1 = toml::from_str(input)?;
    Ok(cfg)
}

/// Resolve the effective run configuration (defaults + config file + overrides).
pub fn resolve_config(cfg: EnactConfigV1, overrides: Overrides) -> anyhow::Result<ResolvedConfig> {
    resolve::resolve_config(cfg, overrides)
}
