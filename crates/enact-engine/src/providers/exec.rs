use super::Provider;
use crate::model::Resource;
use crate::report::Event;
use serde_json::Value as JsonValue;
use std::path::Path;
use std::process::Command;

/// Runs a shell command: `command`, `cwd`, `returns`, `creates`.
pub struct ExecProvider;

impl Provider for ExecProvider {
    fn enforce(&self, resource: &Resource) -> Vec<Event> {
        let params = &resource.parameters;
        let command = params.get_str("command").unwrap_or(resource.title());

        if let Some(creates) = params.get_str("creates") {
            if Path::new(creates).exists() {
                tracing::debug!(command, creates, "skipping exec; target already exists");
                return Vec::new();
            }
        }

        let returns = match expected_returns(params.get("returns")) {
            Ok(codes) => codes,
            Err(message) => return vec![Event::failure("returns", message)],
        };

        let mut cmd = shell(command);
        if let Some(cwd) = params.get_str("cwd") {
            cmd.current_dir(cwd);
        }

        let output = match cmd.output() {
            Ok(output) => output,
            Err(err) => {
                return vec![Event::failure(
                    "returns",
                    format!("Could not execute '{command}': {err}"),
                )];
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::debug!(command, %stdout, %stderr, "exec finished");

        match output.status.code() {
            Some(code) if returns.contains(&code) => {
                vec![Event::success("returns", "executed successfully")]
            }
            Some(code) => vec![Event::failure(
                "returns",
                format!(
                    "'{command}' returned {code} instead of one of [{}]",
                    returns
                        .iter()
                        .map(i32::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            )],
            None => vec![Event::failure(
                "returns",
                format!("'{command}' was terminated by a signal"),
            )],
        }
    }
}

fn expected_returns(value: Option<&JsonValue>) -> Result<Vec<i32>, String> {
    let as_code = |v: &JsonValue| -> Result<i32, String> {
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| format!("Invalid exit code '{v}' in returns"))
    };
    match value {
        None => Ok(vec![0]),
        Some(JsonValue::Array(items)) => items.iter().map(as_code).collect(),
        Some(other) => Ok(vec![as_code(other)?]),
    }
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}
