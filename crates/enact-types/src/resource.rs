use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Identifies one enforcement target.
///
/// The two derived string forms are produced here and nowhere else:
/// - [`ResourceRef::display_ref`]: `Type[name]`, used in messages
/// - [`ResourceRef::storage_key`]: `type/name`, used to address the resource store
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub struct ResourceRef {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
}

impl ResourceRef {
    pub fn new<T: Into<String>, N: Into<String>>(type_name: T, name: N) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }

    /// Human-readable `Type[name]` form. Every `::` segment of the type is capitalized.
    pub fn display_ref(&self) -> String {
        format!("{}[{}]", capitalize_type(&self.type_name), self.name)
    }

    /// `type/name` form used as the resource store key.
    pub fn storage_key(&self) -> String {
        format!("{}/{}", self.type_name, self.name)
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_ref())
    }
}

fn capitalize_type(type_name: &str) -> String {
    type_name
        .split("::")
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("::")
}

/// Attribute name to value, passed verbatim to backends.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, JsonValue>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>>(&mut self, key: K, value: JsonValue) -> Option<JsonValue> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    /// String value of `key`, if present and a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(JsonValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, JsonValue>> for ParameterSet {
    fn from(value: BTreeMap<String, JsonValue>) -> Self {
        Self(value)
    }
}

impl<K: Into<String>> FromIterator<(K, JsonValue)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, JsonValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A resource the run reports as managed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EnforcedResource {
    pub reference: ResourceRef,
    #[serde(default, skip_serializing_if = "ParameterSet::is_empty")]
    pub parameters: ParameterSet,
}

impl EnforcedResource {
    pub fn new(reference: ResourceRef, parameters: ParameterSet) -> Self {
        Self {
            reference,
            parameters,
        }
    }
}
