//! Script format: a TOML document of variables and ordered steps.
//!
//! Parsing is split in two: serde handles the shape ([`ScriptFileV1`]), then [`parse_script`]
//! validates every step into a [`Script`] so that malformed steps are rejected before any
//! enforcement call is made.

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_LOOP_BINDING: &str = "item";

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script is not valid TOML: {0}")]
    Syntax(String),
    #[error("step {step}: {message}")]
    Malformed { step: usize, message: String },
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ScriptFileV1 {
    /// Script-level variables, visible to every step.
    #[serde(default)]
    pub vars: BTreeMap<String, JsonValue>,

    #[serde(default)]
    pub step: Vec<StepDecl>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StepDecl {
    /// Resource type, e.g. `file`. Requires `name`.
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub params: Option<BTreeMap<String, JsonValue>>,

    /// Manifest code to compile and enforce as one catalog.
    #[serde(default)]
    pub apply: Option<String>,

    /// Variable bindings.
    #[serde(default)]
    pub set: Option<BTreeMap<String, JsonValue>>,

    #[serde(default)]
    pub when: Option<ConditionDecl>,
    #[serde(default)]
    pub unless: Option<ConditionDecl>,

    /// Name of a list variable; the step runs once per element.
    #[serde(default)]
    pub foreach: Option<String>,
    #[serde(default, rename = "as")]
    pub binding: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ConditionDecl {
    pub var: String,
    #[serde(default)]
    pub equals: Option<JsonValue>,
    #[serde(default)]
    pub not_equals: Option<JsonValue>,
    #[serde(default)]
    pub exists: Option<bool>,
}

/// A validated script, ready for the interpreter.
#[derive(Clone, Debug, PartialEq)]
pub struct Script {
    pub vars: BTreeMap<String, JsonValue>,
    pub steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    /// 1-based position in the script, for messages.
    pub index: usize,
    pub action: Action,
    pub when: Option<Condition>,
    pub unless: Option<Condition>,
    pub foreach: Option<Loop>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Resource {
        type_name: String,
        name: String,
        params: BTreeMap<String, JsonValue>,
    },
    Apply {
        code: String,
    },
    Set {
        bindings: BTreeMap<String, JsonValue>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub var: String,
    pub test: ConditionTest,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConditionTest {
    Equals(JsonValue),
    NotEquals(JsonValue),
    Exists(bool),
}

impl Condition {
    /// `value` is `None` when the variable is not bound.
    pub fn holds(&self, value: Option<&JsonValue>) -> bool {
        match &self.test {
            ConditionTest::Exists(expected) => value.is_some() == *expected,
            ConditionTest::Equals(expected) => value == Some(expected),
            ConditionTest::NotEquals(expected) => value != Some(expected),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Loop {
    pub list_var: String,
    pub binding: String,
}

/// Parse and validate script text.
pub fn parse_script(input: &str) -> Result<Script, ScriptError> {
    let file: ScriptFileV1 =
        toml::from_str(input).map_err(|e| ScriptError::Syntax(e.message().to_string()))?;

    let steps = file
        .step
        .into_iter()
        .enumerate()
        .map(|(i, decl)| validate_step(i + 1, decl))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Script {
        vars: file.vars,
        steps,
    })
}

fn validate_step(index: usize, decl: StepDecl) -> Result<Step, ScriptError> {
    let malformed = |message: String| ScriptError::Malformed {
        step: index,
        message,
    };

    let has_resource_fields = decl.name.is_some() || decl.params.is_some();
    let action = match (decl.resource, decl.apply, decl.set) {
        (Some(type_name), None, None) => {
            let type_name = type_name.trim().to_string();
            if type_name.is_empty() {
                return Err(malformed("resource type must not be empty".to_string()));
            }
            let name = decl
                .name
                .ok_or_else(|| malformed(format!("resource '{type_name}' needs a name")))?;
            Action::Resource {
                type_name,
                name,
                params: decl.params.unwrap_or_default(),
            }
        }
        (None, Some(code), None) => Action::Apply { code },
        (None, None, Some(bindings)) => Action::Set { bindings },
        (None, None, None) => {
            return Err(malformed(
                "expected one of 'resource', 'apply', or 'set'".to_string(),
            ));
        }
        _ => {
            return Err(malformed(
                "only one of 'resource', 'apply', or 'set' may be given".to_string(),
            ));
        }
    };

    if has_resource_fields && !matches!(action, Action::Resource { .. }) {
        return Err(malformed(
            "'name' and 'params' only apply to resource steps".to_string(),
        ));
    }

    let foreach = match (decl.foreach, decl.binding) {
        (Some(list_var), binding) => Some(Loop {
            list_var,
            binding: binding.unwrap_or_else(|| DEFAULT_LOOP_BINDING.to_string()),
        }),
        (None, Some(_)) => return Err(malformed("'as' requires 'foreach'".to_string())),
        (None, None) => None,
    };

    Ok(Step {
        index,
        action,
        when: decl.when.map(validate_condition).transpose().map_err(malformed)?,
        unless: decl
            .unless
            .map(validate_condition)
            .transpose()
            .map_err(malformed)?,
        foreach,
    })
}

fn validate_condition(decl: ConditionDecl) -> Result<Condition, String> {
    let test = match (decl.equals, decl.not_equals, decl.exists) {
        (Some(v), None, None) => ConditionTest::Equals(v),
        (None, Some(v), None) => ConditionTest::NotEquals(v),
        (None, None, Some(b)) => ConditionTest::Exists(b),
        _ => {
            return Err(format!(
                "condition on '{}' needs exactly one of 'equals', 'not_equals', or 'exists'",
                decl.var
            ));
        }
    };
    Ok(Condition {
        var: decl.var,
        test,
    })
}
