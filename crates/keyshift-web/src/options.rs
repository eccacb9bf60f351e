#![forbid(unsafe_code)]

//! Construction options for the browser adapter.
//!
//! Options arrive from JS as one JSON object. Missing keys fall back to the
//! defaults, so `{}` (or no argument at all) is a valid configuration:
//!
//! ```json
//! {
//!   "engine": { "focus_grace_ms": 3000 },
//!   "dom": { "input_id": "composer", "chat_container_id": "thread" }
//! }
//! ```

use keyshift_core::{ConfigError, ConfigViolation, EngineConfig};
use serde::{Deserialize, Serialize};

/// Element ids and class names the adapter reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomBindings {
    /// The designated message input.
    pub input_id: String,
    /// Container of the input bar; receives the inline transform override.
    pub input_container_id: String,
    /// Scrollable chat list kept anchored across viewport changes.
    pub chat_container_id: String,
    /// Body class raised while the keyboard is visible.
    pub keyboard_visible_class: String,
    /// Body class raised while hover effects are suppressed.
    pub hover_suppressed_class: String,
}

impl Default for DomBindings {
    fn default() -> Self {
        Self {
            input_id: "message-input".into(),
            input_container_id: "input-container".into(),
            chat_container_id: "chat-container".into(),
            keyboard_visible_class: "keyboard-visible".into(),
            hover_suppressed_class: "suppress-message-hover".into(),
        }
    }
}

impl DomBindings {
    fn validate_into(&self, errors: &mut Vec<ConfigViolation>) {
        let names = [
            ("dom.input_id", &self.input_id),
            ("dom.input_container_id", &self.input_container_id),
            ("dom.chat_container_id", &self.chat_container_id),
            ("dom.keyboard_visible_class", &self.keyboard_visible_class),
            ("dom.hover_suppressed_class", &self.hover_suppressed_class),
        ];
        for (field, value) in names {
            if value.is_empty() {
                errors.push(ConfigViolation::new(field, "\"\"", "must not be empty"));
            } else if value.chars().any(char::is_whitespace) {
                errors.push(ConfigViolation::new(field, value, "must not contain whitespace"));
            }
        }
    }
}

/// Everything `new KeyboardCompensator(json)` accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompensatorOptions {
    pub engine: EngineConfig,
    pub dom: DomBindings,
}

impl CompensatorOptions {
    /// Parse from JSON and validate both sections.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(s)?;
        options.validate().map_err(ConfigError::Invalid)?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), Vec<ConfigViolation>> {
        let mut errors = match self.engine.validate() {
            Ok(()) => Vec::new(),
            Err(errors) => errors,
        };
        self.dom.validate_into(&mut errors);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_object_yields_defaults() {
        let options = CompensatorOptions::from_json_str("{}").unwrap();
        assert_eq!(options, CompensatorOptions::default());
        assert_eq!(options.dom.input_id, "message-input");
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let options = CompensatorOptions::from_json_str(
            r#"{"engine":{"focus_grace_ms":3000},"dom":{"input_id":"composer"}}"#,
        )
        .unwrap();
        assert_eq!(options.engine.focus_grace_ms, 3000);
        assert_eq!(options.engine.stable_dwell_ms, 140);
        assert_eq!(options.dom.input_id, "composer");
        assert_eq!(options.dom.chat_container_id, "chat-container");
    }

    #[test]
    fn violations_from_both_sections_are_reported_together() {
        let err = CompensatorOptions::from_json_str(
            r#"{"engine":{"stable_dwell_ms":0},"dom":{"keyboard_visible_class":"a b"}}"#,
        )
        .unwrap_err();
        let ConfigError::Invalid(violations) = err else {
            panic!("expected validation failure, got {err:?}");
        };
        let fields: Vec<&str> = violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["stable_dwell_ms", "dom.keyboard_visible_class"]);
    }

    #[test]
    fn empty_id_is_rejected() {
        let mut options = CompensatorOptions::default();
        options.dom.input_id.clear();
        let violations = options.validate().unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, "dom.input_id");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            CompensatorOptions::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }
}
