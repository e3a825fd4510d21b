//! Editor inspector surface
//!
//! The runtime never draws anything itself. An editor implements [`InspectorUi`]
//! and hands it to [`Behavior::render_inspector`](crate::ecs::Behavior::render_inspector).

use serde_json::Value;

/// Minimal widget set an editor exposes to behaviors
pub trait InspectorUi {
    /// Plain text line
    fn text(&mut self, text: &str);

    /// Read-only labelled value
    fn value(&mut self, label: &str, value: &Value);

    /// Editable float; returns true if the user changed it
    fn drag_float(&mut self, label: &str, value: &mut f32) -> bool;

    /// Editable boolean; returns true if the user changed it
    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool;

    /// Editable string; returns true if the user changed it
    fn input_text(&mut self, label: &str, value: &mut String) -> bool;
}

/// Inspector that records every call as a line of text
///
/// Used by headless tooling and tests to snapshot what a behavior would draw.
#[derive(Debug, Default)]
pub struct TextInspector {
    /// Lines emitted so far
    pub lines: Vec<String>,
}

impl InspectorUi for TextInspector {
    fn text(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn value(&mut self, label: &str, value: &Value) {
        self.lines.push(format!("{label}: {value}"));
    }

    fn drag_float(&mut self, label: &str, value: &mut f32) -> bool {
        self.lines.push(format!("{label}: {value}"));
        false
    }

    fn checkbox(&mut self, label: &str, value: &mut bool) -> bool {
        self.lines.push(format!("{label}: {value}"));
        false
    }

    fn input_text(&mut self, label: &str, value: &mut String) -> bool {
        self.lines.push(format!("{label}: {value}"));
        false
    }
}
