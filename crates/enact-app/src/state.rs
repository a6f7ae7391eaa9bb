use enact_types::EnforcedResource;

/// Ledger for one script run: what was enforced and what failed, both in script order.
///
/// Append-only; owned by the interpreter and read once when the run ends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScriptRunState {
    errors: Vec<String>,
    enforced: Vec<EnforcedResource>,
}

impl ScriptRunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn record_enforced(&mut self, resource: EnforcedResource) {
        self.enforced.push(resource);
    }

    pub fn extend_enforced(&mut self, resources: impl IntoIterator<Item = EnforcedResource>) {
        self.enforced.extend(resources);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn enforced(&self) -> &[EnforcedResource] {
        &self.enforced
    }

    pub fn failure_count(&self) -> usize {
        self.errors.len()
    }

    pub fn managed_count(&self) -> usize {
        self.enforced.len()
    }

    /// `Managed <N> resources with <M> failures.`
    pub fn summary_line(&self) -> String {
        format!(
            "Managed {} resources with {} failures.",
            self.managed_count(),
            self.failure_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enact_types::{ParameterSet, ResourceRef};

    #[test]
    fn summary_reflects_ledger() {
        let mut state = ScriptRunState::new();
        assert_eq!(state.summary_line(), "Managed 0 resources with 0 failures.");

        state.record_enforced(EnforcedResource::new(
            ResourceRef::new("file", "/tmp/a"),
            ParameterSet::new(),
        ));
        state.record_failure("first");
        state.record_failure("second");

        assert_eq!(state.summary_line(), "Managed 1 resources with 2 failures.");
        assert_eq!(state.errors(), ["first", "second"]);
    }
}
