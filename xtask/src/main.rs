//! Developer tasks (schema generation, receipt conformance).
//!
//! Keeping this separate avoids bloating the end-user CLI.

use anyhow::{Context, bail};
use enact_test_util::normalize_nondeterministic;
use schemars::schema_for;
use std::fs;
use std::path::{Path, PathBuf};

/// Get the project root (parent of xtask directory).
fn project_root() -> anyhow::Result<PathBuf> {
    let manifest_dir = match std::env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => std::env::current_dir().context("Cannot determine current directory")?,
    };

    if manifest_dir.ends_with("xtask") {
        manifest_dir
            .parent()
            .map(Path::to_path_buf)
            .context("xtask has no parent")
    } else {
        Ok(manifest_dir)
    }
}

/// Schema definition with its target filename.
struct SchemaSpec {
    filename: &'static str,
    generate: fn() -> schemars::Schema,
}

fn schema_specs() -> Vec<SchemaSpec> {
    vec![
        SchemaSpec {
            filename: "enact.run.v1.json",
            generate: || schema_for!(enact_types::RunReceipt),
        },
        SchemaSpec {
            filename: "enact.config.v1.json",
            generate: || schema_for!(enact_settings::EnactConfigV1),
        },
        SchemaSpec {
            filename: "enact.script.v1.json",
            generate: || schema_for!(enact_app::ScriptFileV1),
        },
    ]
}

/// Serialize a schema to pretty-printed JSON with trailing newline.
fn serialize_schema(schema: &schemars::Schema) -> anyhow::Result<String> {
    let mut json = serde_json::to_string_pretty(schema).context("Failed to serialize schema")?;
    json.push('\n');
    Ok(json)
}

/// Emit schemas to the schemas/ directory.
fn emit_schemas() -> anyhow::Result<()> {
    let dir = project_root()?.join("schemas");
    fs::create_dir_all(&dir).context("Failed to create schemas directory")?;

    for spec in schema_specs() {
        let json = serialize_schema(&(spec.generate)())?;
        let path = dir.join(spec.filename);
        fs::write(&path, &json)
            .with_context(|| format!("Failed to write schema to {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    println!("\nSchemas emitted successfully.");
    Ok(())
}

/// Run the enact binary over every fixture, validating each receipt against the generated
/// schema and its golden file.
fn conform() -> anyhow::Result<()> {
    let root = project_root()?;
    let schema = serde_json::to_value(schema_for!(enact_types::RunReceipt))
        .context("Failed to convert receipt schema")?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| anyhow::anyhow!("Failed to compile schema: {e}"))?;

    let enact_bin = root.join("target").join("debug").join("enact");
    #[cfg(target_os = "windows")]
    let enact_bin = enact_bin.with_extension("exe");
    if !enact_bin.exists() {
        bail!(
            "enact binary not found at {}.\nRun `cargo build -p enact-cli` first.",
            enact_bin.display()
        );
    }

    let fixtures_dir = root.join("tests").join("fixtures");
    let mut errors = Vec::new();

    let mut fixtures: Vec<PathBuf> = fs::read_dir(&fixtures_dir)
        .context("Failed to read tests/fixtures/")?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.join("script.toml").exists())
        .collect();
    fixtures.sort();

    for fixture in fixtures {
        let name = fixture
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let temp_dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let receipt_path = temp_dir.path().join("receipt.json");

        let output = std::process::Command::new(&enact_bin)
            .current_dir(&fixture)
            .arg("script.toml")
            .arg("--report-out")
            .arg(&receipt_path)
            .output()
            .with_context(|| format!("Failed to run enact on fixture '{name}'"))?;

        if !receipt_path.exists() {
            errors.push(format!(
                "fixture '{name}': no receipt written (exit {:?}): {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr)
            ));
            continue;
        }

        let receipt: serde_json::Value = serde_json::from_str(&fs::read_to_string(&receipt_path)?)
            .with_context(|| format!("Failed to parse receipt for fixture '{name}'"))?;

        for err in validator.iter_errors(&receipt) {
            errors.push(format!("fixture '{name}': schema validation: {err}"));
        }

        if receipt["exit_code"].as_i64() != output.status.code().map(i64::from) {
            errors.push(format!(
                "fixture '{name}': receipt exit_code {} but process exited with {:?}",
                receipt["exit_code"],
                output.status.code()
            ));
        }

        let golden_path = fixture.join("expected.receipt.json");
        if golden_path.exists() {
            let golden: serde_json::Value =
                serde_json::from_str(&fs::read_to_string(&golden_path)?)?;
            if normalize_nondeterministic(receipt) != normalize_nondeterministic(golden) {
                errors.push(format!(
                    "fixture '{name}': output differs from golden file expected.receipt.json"
                ));
                continue;
            }
        }
        println!("  ok fixture '{name}'");
    }

    if !errors.is_empty() {
        eprintln!("\nConformance errors:");
        for err in &errors {
            eprintln!("  - {err}");
        }
        bail!("Conformance failed with {} errors", errors.len());
    }

    println!("\nConformance checks passed.");
    Ok(())
}

fn print_help() {
    eprintln!("xtask commands:");
    eprintln!("  help              Show this message");
    eprintln!("  emit-schemas      Generate JSON schemas from Rust types to schemas/");
    eprintln!("  print-schema-ids  Print known schema IDs");
    eprintln!("  conform           Run fixtures and validate receipts against enact.run.v1");
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(|s| s.as_str()).unwrap_or("help");

    match cmd {
        "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "emit-schemas" => emit_schemas(),
        "conform" => conform(),
        "print-schema-ids" => {
            for spec in schema_specs() {
                println!("{}", spec.filename.trim_end_matches(".json"));
            }
            Ok(())
        }
        other => bail!("unknown xtask command: {other}\n\nRun `cargo xtask help` for usage."),
    }
    .context("xtask failed")
}
