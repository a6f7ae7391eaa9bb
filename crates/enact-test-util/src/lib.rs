//! Shared test utilities for the enact workspace.
//!
//! Lives outside `#[cfg(test)]` so that both the CLI integration tests and `xtask` can use it.

use serde_json::Value;

pub const TIMESTAMP_PLACEHOLDER: &str = "__TIMESTAMP__";
pub const VERSION_PLACEHOLDER: &str = "__VERSION__";

/// Normalize non-deterministic run receipt fields for golden comparison.
///
/// `tool.version` is replaced only when the root looks like a receipt (`schema`, `tool`, `run`,
/// `managed`, `failures`). Timestamps and `duration_ms` are replaced at any depth.
pub fn normalize_nondeterministic(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        let is_receipt = ["schema", "tool", "run", "managed", "failures"]
            .iter()
            .all(|k| obj.contains_key(*k));
        if is_receipt
            && let Some(tool) = obj.get_mut("tool").and_then(Value::as_object_mut)
            && tool.contains_key("version")
        {
            tool.insert(
                "version".to_string(),
                Value::String(VERSION_PLACEHOLDER.to_string()),
            );
        }
    }
    normalize_timestamps_recursive(&mut value);
    value
}

/// Replace every occurrence of `prefix` inside string values with `placeholder`.
///
/// Receipts embed script paths and managed resource titles; tests run in temp dirs, so the
/// directory has to be masked before comparing.
pub fn mask_prefix(value: Value, prefix: &str, placeholder: &str) -> Value {
    match value {
        Value::String(s) if !prefix.is_empty() => Value::String(s.replace(prefix, placeholder)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| mask_prefix(v, prefix, placeholder))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, mask_prefix(v, prefix, placeholder)))
                .collect(),
        ),
        other => other,
    }
}

fn normalize_timestamps_recursive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for key in ["started_at", "ended_at"] {
                if map.contains_key(key) {
                    map.insert(
                        key.to_string(),
                        Value::String(TIMESTAMP_PLACEHOLDER.to_string()),
                    );
                }
            }
            if map.contains_key("duration_ms") {
                map.insert("duration_ms".to_string(), Value::Number(0.into()));
            }
            for val in map.values_mut() {
                normalize_timestamps_recursive(val);
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(normalize_timestamps_recursive),
        _ => {}
    }
}
