//! CLI entry point for enact.
//!
//! This module is intentionally thin: it handles argument parsing, I/O, and exit codes.
//! All evaluation logic lives in the `enact-app` crate.

mod logging;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use enact_app::{Abort, RunInput, run_script, serialize_receipt};
use enact_settings::Overrides;
use enact_types::RunReceipt;

#[derive(Parser, Debug)]
#[command(
    name = "enact",
    version,
    about = "Evaluate a resource script and enforce what it declares"
)]
struct Cli {
    /// Script to evaluate.
    script: Utf8PathBuf,

    /// Further scripts are accepted but skipped; one script runs per invocation.
    extra: Vec<String>,

    /// Dump every enforcement result.
    #[arg(short, long)]
    debug: bool,

    /// Continue after a resource fails to enforce.
    #[arg(short = 'k', long)]
    keep_going: bool,

    /// Log each resource as it is enforced.
    #[arg(short, long)]
    verbose: bool,

    /// Path to enact config TOML (a missing file means defaults).
    #[arg(long, default_value = "enact.toml")]
    config: Utf8PathBuf,

    /// Override backend (in-process|delegating).
    #[arg(long)]
    backend: Option<String>,

    /// Override the delegating backend's enforcer program.
    #[arg(long)]
    enforcer: Option<String>,

    /// Enforcer argument placed before the code; repeat for several.
    #[arg(long = "enforcer-arg", allow_hyphen_values = true)]
    enforcer_args: Vec<String>,

    /// Override the node name used to compile code blocks.
    #[arg(long)]
    node_name: Option<String>,

    /// Write a JSON run receipt here.
    #[arg(long)]
    report_out: Option<Utf8PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    // Load config if present; missing file is allowed (defaults apply).
    let cfg_text = std::fs::read_to_string(&cli.config).unwrap_or_default();
    let (debug, verbose) = log_levels_from_config(&cli, &cfg_text);
    logging::init(debug, verbose);

    match cmd_run(&cli, &cfg_text) {
        Ok(code) => {
            if code != 0 {
                std::process::exit(code);
            }
        }
        Err(err) => {
            eprintln!("enact error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn cmd_run(cli: &Cli, cfg_text: &str) -> anyhow::Result<i32> {
    let overrides = Overrides {
        debug: cli.debug.then_some(true),
        keep_going: cli.keep_going.then_some(true),
        verbose: cli.verbose.then_some(true),
        backend: cli.backend.clone(),
        node_name: cli.node_name.clone(),
        enforcer_program: cli.enforcer.clone(),
        enforcer_args: (!cli.enforcer_args.is_empty()).then(|| cli.enforcer_args.clone()),
    };

    let output = run_script(RunInput {
        script_path: &cli.script,
        extra_args: &cli.extra,
        config_text: cfg_text,
        overrides,
    })?;
    let outcome = &output.outcome;

    // Evaluation faults are already part of the failure list below.
    if let Some(Abort::EnforcementFailed(message)) = &outcome.abort {
        eprintln!("{message}");
    }
    println!("{}", outcome.summary_line());
    for failure in outcome.state.errors() {
        eprintln!("{failure}");
    }

    if let Some(path) = &cli.report_out {
        write_receipt_file(path, &output.receipt).context("write run receipt")?;
    }

    Ok(outcome.exit_code())
}

/// Quick look at the config for logging flags; full resolution happens in the run itself.
fn log_levels_from_config(cli: &Cli, cfg_text: &str) -> (bool, bool) {
    let cfg = enact_settings::parse_config_toml(cfg_text).unwrap_or_default();
    (
        cli.debug || cfg.debug.unwrap_or(false),
        cli.verbose || cfg.verbose.unwrap_or(false),
    )
}

fn write_receipt_file(path: &Utf8Path, receipt: &RunReceipt) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        std::fs::create_dir_all(parent).with_context(|| format!("create directory: {parent}"))?;
    }
    let data = serialize_receipt(receipt)?;
    std::fs::write(path, data).with_context(|| format!("write receipt: {path}"))?;
    Ok(())
}
