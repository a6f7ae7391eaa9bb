//! The seam between the interpreter and whatever actually enforces resources.

use crate::error::RunError;
use enact_types::{EnforcedResource, ParameterSet, ResourceRef, RunOptions};

/// Outcome of a single resource enforcement, normalized across backends.
#[derive(Clone, Debug, PartialEq)]
pub struct EnforcementResult {
    pub succeeded: bool,
    /// Backend-specific reason; only set when `succeeded` is false.
    pub failure_message: Option<String>,
    pub enforced: EnforcedResource,
}

impl EnforcementResult {
    pub fn success(enforced: EnforcedResource) -> Self {
        Self {
            succeeded: true,
            failure_message: None,
            enforced,
        }
    }

    pub fn failure(enforced: EnforcedResource, message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            failure_message: Some(message.into()),
            enforced,
        }
    }
}

/// Outcome of a code block. `enforced` lists the managed (non-scaffolding) resources in catalog
/// order, whether or not the block failed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockOutcome {
    pub enforced: Vec<EnforcedResource>,
    pub failure_message: Option<String>,
}

pub trait EnforcementBackend {
    /// Enforce one resource. Never fails the run by itself; the caller decides what a failed
    /// result means.
    fn enforce(
        &mut self,
        reference: &ResourceRef,
        parameters: &ParameterSet,
        options: &RunOptions,
    ) -> EnforcementResult;
}

pub trait CodeBlockBackend {
    /// Compile and enforce a block of manifest code.
    ///
    /// Code that cannot be compiled is a [`RunError::ScriptEvaluationFault`]; enforcement
    /// failures come back in [`BlockOutcome::failure_message`].
    fn apply_block(&mut self, code: &str, options: &RunOptions) -> Result<BlockOutcome, RunError>;
}

/// Everything the interpreter needs from a backend.
pub trait ScriptBackend: EnforcementBackend + CodeBlockBackend {}

impl<T: EnforcementBackend + CodeBlockBackend> ScriptBackend for T {}
