use super::Provider;
use crate::model::Resource;
use crate::report::Event;

/// Logs a message. Always reports a change, like a notice would.
pub struct NotifyProvider;

impl Provider for NotifyProvider {
    fn enforce(&self, resource: &Resource) -> Vec<Event> {
        let message = match resource.parameters.get("message") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => resource.title().to_string(),
        };
        tracing::info!(target: "enact::notify", "{}: {}", resource.display_ref(), message);
        vec![Event::success("message", format!("defined 'message' as '{message}'"))]
    }
}
