use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use vigil_core::ValidationResult;

use crate::validator::{result_with_details, Validator};

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());

/// Extracts the first fenced JSON block, or attempts to parse the whole
/// text, and checks for required top-level fields.
pub struct JsonValidator {
    name: String,
    required_fields: Vec<String>,
}

impl JsonValidator {
    pub fn new(name: impl Into<String>, required_fields: Vec<String>) -> Self {
        Self {
            name: name.into(),
            required_fields,
        }
    }
}

impl Validator for JsonValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "extracts a JSON object from the output and checks required fields"
    }

    fn validate(&self, text: &str) -> ValidationResult {
        let candidate = JSON_FENCE
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| text.trim().to_string());

        let parsed: Value = match serde_json::from_str(&candidate) {
            Ok(v) => v,
            Err(e) => {
                let mut details = serde_json::Map::new();
                details.insert("parse_error".into(), json!(e.to_string()));
                return result_with_details(false, "output did not contain valid JSON", details);
            }
        };

        let object = match parsed.as_object() {
            Some(obj) => obj,
            None => {
                return result_with_details(false, "parsed JSON is not an object", Default::default());
            }
        };

        let missing: Vec<&String> = self.required_fields.iter().filter(|f| !object.contains_key(*f)).collect();
        let mut details = serde_json::Map::new();
        details.insert("missing_fields".into(), json!(missing));

        if missing.is_empty() {
            result_with_details(true, "all required fields present", details)
        } else {
            let msg = format!("missing required field(s): {}", missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", "));
            result_with_details(false, msg, details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_fenced_json_and_checks_fields() {
        let v = JsonValidator::new("shape", vec!["status".into(), "count".into()]);
        let text = "Here is the result:\n```json\n{\"status\": \"ok\", \"count\": 3}\n```\n";
        let outcome = v.validate(text);
        assert!(outcome.is_valid);
    }

    #[test]
    fn reports_missing_fields() {
        let v = JsonValidator::new("shape", vec!["status".into()]);
        let outcome = v.validate(r#"{"count": 3}"#);
        assert!(!outcome.is_valid);
    }

    #[test]
    fn invalid_json_fails() {
        let v = JsonValidator::new("shape", vec![]);
        let outcome = v.validate("not json");
        assert!(!outcome.is_valid);
    }
}
