//! Script evaluation: walks the steps, resolves variables, and turns `resource` / `apply` steps
//! into backend calls.
//!
//! The keep-going policy lives here and only here. Backends report failures; the interpreter
//! records them and decides whether the run continues.

use crate::backend::ScriptBackend;
use crate::error::RunError;
use crate::script::{Action, Condition, Script, Step};
use crate::state::ScriptRunState;
use enact_types::{ParameterSet, ResourceRef, RunOptions};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

const FACTS_PREFIX: &str = "facts.";
const ENV_PREFIX: &str = "env.";

pub struct Interpreter<'b> {
    backend: &'b mut dyn ScriptBackend,
    options: RunOptions,
    vars: BTreeMap<String, JsonValue>,
    facts: BTreeMap<String, JsonValue>,
    state: ScriptRunState,
}

impl<'b> Interpreter<'b> {
    pub fn new(
        backend: &'b mut dyn ScriptBackend,
        options: RunOptions,
        facts: BTreeMap<String, JsonValue>,
    ) -> Self {
        Self {
            backend,
            options,
            vars: BTreeMap::new(),
            facts,
            state: ScriptRunState::new(),
        }
    }

    /// Evaluate every step in order. An `Err` means evaluation stopped early; whatever was
    /// recorded up to that point is still in [`Interpreter::state`].
    pub fn evaluate(&mut self, script: &Script) -> Result<(), RunError> {
        self.vars.extend(script.vars.clone());
        for step in &script.steps {
            self.execute(step)?;
        }
        Ok(())
    }

    pub fn state(&self) -> &ScriptRunState {
        &self.state
    }

    pub fn into_state(self) -> ScriptRunState {
        self.state
    }

    /// Enforce one resource through the backend and apply the keep-going policy.
    pub fn resource(
        &mut self,
        reference: ResourceRef,
        parameters: ParameterSet,
    ) -> Result<(), RunError> {
        let display_ref = reference.display_ref();
        if self.options.verbose {
            tracing::info!("Enforcing {display_ref}");
        }

        let result = self
            .backend
            .enforce(&reference, &parameters, &self.options);
        if !result.succeeded {
            let message = result
                .failure_message
                .unwrap_or_else(|| format!("Failed enforcing {display_ref}"));
            tracing::debug!(resource = %display_ref, %message, "enforcement failed");
            self.state.record_failure(message);
            if !self.options.keep_going {
                return Err(RunError::ResourceEnforcementFailed {
                    message: format!("Failed enforcing {display_ref}"),
                });
            }
        }

        self.state.record_enforced(result.enforced);
        Ok(())
    }

    /// Enforce a block of manifest code through the backend and apply the keep-going policy.
    pub fn apply(&mut self, code: &str) -> Result<(), RunError> {
        if self.options.verbose {
            tracing::info!("Running code block");
        }

        let outcome = self.backend.apply_block(code, &self.options)?;
        if let Some(message) = outcome.failure_message {
            self.state.record_failure(message.clone());
            if !self.options.keep_going {
                return Err(RunError::ResourceEnforcementFailed { message });
            }
        }

        self.state.extend_enforced(outcome.enforced);
        Ok(())
    }

    fn execute(&mut self, step: &Step) -> Result<(), RunError> {
        let Some(lp) = &step.foreach else {
            return self.execute_once(step);
        };

        let items = match self.lookup(&lp.list_var) {
            Some(JsonValue::Array(items)) => items,
            Some(other) => {
                return Err(RunError::fault(format!(
                    "step {}: foreach variable '{}' is not a list (got {other})",
                    step.index, lp.list_var
                )));
            }
            None => {
                return Err(RunError::fault(format!(
                    "step {}: undefined variable '{}'",
                    step.index, lp.list_var
                )));
            }
        };

        let shadowed = self.vars.get(&lp.binding).cloned();
        let mut result = Ok(());
        for item in items {
            self.vars.insert(lp.binding.clone(), item);
            result = self.execute_once(step);
            if result.is_err() {
                break;
            }
        }
        match shadowed {
            Some(previous) => self.vars.insert(lp.binding.clone(), previous),
            None => self.vars.remove(&lp.binding),
        };
        result
    }

    fn execute_once(&mut self, step: &Step) -> Result<(), RunError> {
        if let Some(cond) = &step.when
            && !self.check(cond)
        {
            tracing::debug!(step = step.index, var = %cond.var, "skipping step: when");
            return Ok(());
        }
        if let Some(cond) = &step.unless
            && self.check(cond)
        {
            tracing::debug!(step = step.index, var = %cond.var, "skipping step: unless");
            return Ok(());
        }

        match &step.action {
            Action::Resource {
                type_name,
                name,
                params,
            } => {
                let type_name = self.interpolate_str(step.index, type_name)?;
                let name = self.interpolate_str(step.index, name)?;
                let mut parameters = ParameterSet::new();
                for (key, value) in params {
                    parameters.insert(key.clone(), self.interpolate_value(step.index, value)?);
                }
                self.resource(ResourceRef::new(type_name, name), parameters)
            }
            Action::Apply { code } => {
                let code = self.interpolate_str(step.index, code)?;
                self.apply(&code)
            }
            Action::Set { bindings } => {
                for (key, value) in bindings {
                    let value = self.interpolate_value(step.index, value)?;
                    self.vars.insert(key.clone(), value);
                }
                Ok(())
            }
        }
    }

    fn check(&self, cond: &Condition) -> bool {
        cond.holds(self.lookup(&cond.var).as_ref())
    }

    fn lookup(&self, name: &str) -> Option<JsonValue> {
        if let Some(value) = self.vars.get(name) {
            return Some(value.clone());
        }
        if let Some(fact) = name.strip_prefix(FACTS_PREFIX) {
            return self.facts.get(fact).cloned();
        }
        if let Some(var) = name.strip_prefix(ENV_PREFIX) {
            return std::env::var(var).ok().map(JsonValue::String);
        }
        None
    }

    /// A string that is exactly one `${name}` keeps the variable's own type; anything else is
    /// interpolated as text.
    fn interpolate_value(&self, step: usize, value: &JsonValue) -> Result<JsonValue, RunError> {
        match value {
            JsonValue::String(s) => {
                if let Some(name) = whole_placeholder(s) {
                    return self
                        .lookup(name)
                        .ok_or_else(|| undefined(step, name));
                }
                Ok(JsonValue::String(self.interpolate_str(step, s)?))
            }
            JsonValue::Array(items) => items
                .iter()
                .map(|v| self.interpolate_value(step, v))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            JsonValue::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.interpolate_value(step, v)?);
                }
                Ok(JsonValue::Object(out))
            }
            other => Ok(other.clone()),
        }
    }

    /// Replace `${name}` with the variable's text; `$$` is a literal `$`.
    fn interpolate_str(&self, step: usize, input: &str) -> Result<String, RunError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];
            if let Some(after) = tail.strip_prefix('$') {
                out.push('$');
                rest = after;
            } else if let Some(body) = tail.strip_prefix('{') {
                let end = body.find('}').ok_or_else(|| {
                    RunError::fault(format!("step {step}: unterminated '${{' in \"{input}\""))
                })?;
                let name = body[..end].trim();
                let value = self.lookup(name).ok_or_else(|| undefined(step, name))?;
                match value {
                    JsonValue::String(s) => out.push_str(&s),
                    other => out.push_str(&other.to_string()),
                }
                rest = &body[end + 1..];
            } else {
                out.push('$');
                rest = tail;
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn whole_placeholder(s: &str) -> Option<&str> {
    let inner = s.strip_prefix("${")?.strip_suffix('}')?;
    (!inner.contains('}') && !inner.contains("${")).then(|| inner.trim())
}

fn undefined(step: usize, name: &str) -> RunError {
    RunError::fault(format!("step {step}: undefined variable '{name}'"))
}
