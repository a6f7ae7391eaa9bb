//! Backend that hands rendered manifest code to an external enforcer program.

use crate::backend::{BlockOutcome, CodeBlockBackend, EnforcementBackend, EnforcementResult};
use crate::error::RunError;
use enact_engine::render_resource;
use enact_settings::EnforcerCommand;
use enact_types::{EnforcedResource, ParameterSet, ResourceRef, RunOptions};
use std::io::{Read, Write};
use std::process::{Command, Stdio};

/// Runs `<program> <args...> <code>` once per call.
///
/// stdout and stderr of the enforcer share one pipe, so its output keeps the order it was
/// written in. That output is echoed to stdout whether or not it succeeded; a non-zero exit (or
/// death by signal) is a failure whose message is that output.
pub struct DelegatingBackend {
    enforcer: EnforcerCommand,
}

struct Delegated {
    succeeded: bool,
    output: String,
}

impl DelegatingBackend {
    pub fn new(enforcer: EnforcerCommand) -> Self {
        Self { enforcer }
    }

    fn delegate(&self, code: &str, options: &RunOptions) -> Result<Delegated, String> {
        let program = &self.enforcer.program;
        let could_not_run = |e: std::io::Error| format!("Could not run enforcer '{program}': {e}");

        let (mut reader, writer) = std::io::pipe().map_err(could_not_run)?;
        let mut command = Command::new(program);
        command
            .args(&self.enforcer.args)
            .arg(code)
            .stdin(Stdio::null())
            .stdout(writer.try_clone().map_err(could_not_run)?)
            .stderr(writer);
        let mut child = command.spawn().map_err(could_not_run)?;
        // The command still holds the write ends; the read below only sees EOF once they close.
        drop(command);

        let mut raw = Vec::new();
        let read = reader.read_to_end(&mut raw);
        let status = child.wait().map_err(could_not_run)?;
        read.map_err(could_not_run)?;

        let combined = String::from_utf8_lossy(&raw);
        echo(&combined);

        if options.debug {
            tracing::debug!(program = %program, args = ?self.enforcer.args, code, %status, "enforcer finished");
        }

        let succeeded = status.success();
        let output = if !succeeded && combined.trim().is_empty() {
            format!("Enforcer '{program}' exited with {status}")
        } else {
            combined.trim_end().to_string()
        };
        Ok(Delegated { succeeded, output })
    }
}

fn echo(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stdout = std::io::stdout().lock();
    let written = stdout.write_all(output.as_bytes()).and_then(|()| {
        if output.ends_with('\n') {
            Ok(())
        } else {
            stdout.write_all(b"\n")
        }
    });
    if let Err(err) = written.and_then(|()| stdout.flush()) {
        tracing::warn!("could not echo enforcer output: {err}");
    }
}

impl EnforcementBackend for DelegatingBackend {
    fn enforce(
        &mut self,
        reference: &ResourceRef,
        parameters: &ParameterSet,
        options: &RunOptions,
    ) -> EnforcementResult {
        let enforced = EnforcedResource::new(reference.clone(), parameters.clone());
        let code = match render_resource(reference, parameters) {
            Ok(code) => code,
            Err(err) => return EnforcementResult::failure(enforced, err.to_string()),
        };
        match self.delegate(&code, options) {
            Ok(Delegated {
                succeeded: true, ..
            }) => EnforcementResult::success(enforced),
            Ok(Delegated { output, .. }) => EnforcementResult::failure(enforced, output),
            Err(message) => EnforcementResult::failure(enforced, message),
        }
    }
}

impl CodeBlockBackend for DelegatingBackend {
    /// The external enforcer does not report what it managed, so the outcome never lists
    /// resources.
    fn apply_block(&mut self, code: &str, options: &RunOptions) -> Result<BlockOutcome, RunError> {
        let failure_message = match self.delegate(code, options) {
            Ok(Delegated {
                succeeded: true, ..
            }) => None,
            Ok(Delegated { output, .. }) => Some(output),
            Err(message) => Some(message),
        };
        Ok(BlockOutcome {
            enforced: Vec::new(),
            failure_message,
        })
    }
}
