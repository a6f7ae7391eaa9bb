use thiserror::Error;

/// Everything that can end or interrupt a script run.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RunError {
    /// The script path does not exist. Nothing has been enforced.
    #[error("Could not find script file {path}")]
    ScriptNotFound { path: String },

    /// A `resource` or `apply` call failed and keep-going is off.
    #[error("{message}")]
    ResourceEnforcementFailed { message: String },

    /// The script itself is broken: syntax, malformed steps, undefined variables, bad code blocks.
    #[error("{message}")]
    ScriptEvaluationFault { message: String },
}

impl RunError {
    pub fn fault(message: impl Into<String>) -> Self {
        RunError::ScriptEvaluationFault {
            message: message.into(),
        }
    }
}
