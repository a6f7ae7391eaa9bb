use camino::Utf8Path;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Host facts exposed to scripts as `facts.<name>`.
pub fn collect_facts(script_path: &Utf8Path) -> BTreeMap<String, JsonValue> {
    let hostname = std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_string());

    let mut facts = BTreeMap::new();
    facts.insert("os".to_string(), JsonValue::from(std::env::consts::OS));
    facts.insert("family".to_string(), JsonValue::from(std::env::consts::FAMILY));
    facts.insert("arch".to_string(), JsonValue::from(std::env::consts::ARCH));
    facts.insert("hostname".to_string(), JsonValue::from(hostname));
    facts.insert("script".to_string(), JsonValue::from(script_path.as_str()));
    facts
}
