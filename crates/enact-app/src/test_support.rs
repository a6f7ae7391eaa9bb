//! In-memory backend for interpreter and run tests.

use crate::backend::{BlockOutcome, CodeBlockBackend, EnforcementBackend, EnforcementResult};
use crate::error::RunError;
use enact_types::{EnforcedResource, ParameterSet, ResourceRef, RunOptions};
use std::collections::BTreeSet;

/// Records every call. Resources listed via [`FakeBackend::failing`] fail; code blocks fail when
/// the code is `fail` and do not compile when it starts with `!`. Every block manages one
/// `notify` resource titled after the code.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub calls: Vec<String>,
    pub parameters: Vec<ParameterSet>,
    failing: BTreeSet<String>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, display_ref: &str) -> Self {
        self.failing.insert(display_ref.to_string());
        self
    }
}

impl EnforcementBackend for FakeBackend {
    fn enforce(
        &mut self,
        reference: &ResourceRef,
        parameters: &ParameterSet,
        _options: &RunOptions,
    ) -> EnforcementResult {
        let display = reference.display_ref();
        self.calls.push(display.clone());
        self.parameters.push(parameters.clone());

        let enforced = EnforcedResource::new(reference.clone(), parameters.clone());
        if self.failing.contains(&display) {
            EnforcementResult::failure(enforced, format!("{display} failed on purpose"))
        } else {
            EnforcementResult::success(enforced)
        }
    }
}

impl CodeBlockBackend for FakeBackend {
    fn apply_block(&mut self, code: &str, _options: &RunOptions) -> Result<BlockOutcome, RunError> {
        self.calls.push("apply".to_string());
        if let Some(rest) = code.strip_prefix('!') {
            return Err(RunError::fault(format!("Could not parse code block: {rest}")));
        }

        let enforced = vec![EnforcedResource::new(
            ResourceRef::new("notify", code),
            ParameterSet::new(),
        )];
        let failure_message = (code == "fail").then(|| "code block failed".to_string());
        Ok(BlockOutcome {
            enforced,
            failure_message,
        })
    }
}
