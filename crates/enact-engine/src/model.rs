use enact_types::{ParameterSet, ResourceRef};
use serde_json::Value as JsonValue;

/// Metaparameter naming resources that must be enforced first.
pub const META_REQUIRE: &str = "require";
/// Metaparameter naming resources that must be enforced afterwards.
pub const META_BEFORE: &str = "before";

#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub reference: ResourceRef,
    pub parameters: ParameterSet,
    /// Virtual resources are declared but never enforced.
    pub is_virtual: bool,
}

impl Resource {
    pub fn new(reference: ResourceRef, parameters: ParameterSet) -> Self {
        Self {
            reference,
            parameters,
            is_virtual: false,
        }
    }

    pub fn display_ref(&self) -> String {
        self.reference.display_ref()
    }

    pub fn type_name(&self) -> &str {
        &self.reference.type_name
    }

    pub fn title(&self) -> &str {
        &self.reference.name
    }

    /// Resources named by `require`, as references.
    pub fn requires(&self) -> Vec<ResourceRef> {
        references_in(self.parameters.get(META_REQUIRE))
    }

    /// Resources named by `before`, as references.
    pub fn before(&self) -> Vec<ResourceRef> {
        references_in(self.parameters.get(META_BEFORE))
    }
}

fn references_in(value: Option<&JsonValue>) -> Vec<ResourceRef> {
    match value {
        Some(JsonValue::String(s)) => parse_display_ref(s).into_iter().collect(),
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(JsonValue::as_str)
            .filter_map(parse_display_ref)
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse `Type[name]` back into a reference. The type is lowercased.
pub fn parse_display_ref(s: &str) -> Option<ResourceRef> {
    let s = s.trim();
    let open = s.find('[')?;
    let inner = s[open + 1..].strip_suffix(']')?;
    let type_name = &s[..open];
    if type_name.is_empty() {
        return None;
    }
    Some(ResourceRef::new(type_name.to_lowercase(), inner))
}
