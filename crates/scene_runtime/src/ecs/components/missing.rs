//! Placeholder for persisted behaviors whose type is not registered
//!
//! Keeps the original record verbatim so a save after a failed type lookup
//! writes back exactly what was read.

use serde_json::{Map, Value};

use crate::ecs::inspector::InspectorUi;

/// Unresolved persisted behavior
#[derive(Debug, Clone, PartialEq)]
pub struct MissingBehaviorRecord {
    type_name: String,
    payload: Map<String, Value>,
}

impl MissingBehaviorRecord {
    /// Wrap a persisted record whose `type` could not be resolved
    pub fn new(type_name: impl Into<String>, payload: Map<String, Value>) -> Self {
        Self {
            type_name: type_name.into(),
            payload,
        }
    }

    /// Declared type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Original record, `type` key included
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Record to persist: the original payload, key order intact
    pub fn serialize(&self) -> Map<String, Value> {
        let mut data = self.payload.clone();
        if !data.contains_key("type") {
            data.insert("type".into(), Value::String(self.type_name.clone()));
        }
        data
    }

    /// Editor placeholder view
    pub fn render_inspector(&self, ui: &mut dyn InspectorUi) {
        ui.text("This behavior could not be loaded.");
        ui.text(&format!("Type: {}", self.type_name));
        ui.text("Original data:");
        let pretty = serde_json::to_string_pretty(&self.payload).unwrap_or_default();
        ui.text(&pretty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::inspector::TextInspector;
    use serde_json::json;

    #[test]
    fn test_serialize_is_verbatim() {
        let source = r#"{"x":5,"type":"UnknownScript","nested":{"b":1,"a":2}}"#;
        let payload: Map<String, Value> = serde_json::from_str(source).unwrap();
        let record = MissingBehaviorRecord::new("UnknownScript", payload);

        let written = serde_json::to_string(&record.serialize()).unwrap();
        assert_eq!(written, source);
    }

    #[test]
    fn test_type_key_restored_when_absent() {
        let record = MissingBehaviorRecord::new("Ghost", Map::new());
        assert_eq!(Value::Object(record.serialize()), json!({"type": "Ghost"}));
    }

    #[test]
    fn test_inspector_shows_type() {
        let record = MissingBehaviorRecord::new("Ghost", Map::new());
        let mut ui = TextInspector::default();
        record.render_inspector(&mut ui);
        assert!(ui.lines.iter().any(|l| l == "Type: Ghost"));
    }
}
