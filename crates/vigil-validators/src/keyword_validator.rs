use serde_json::json;
use vigil_core::ValidationResult;

use crate::validator::{result_with_details, Validator};

/// Requires presence of all `required` terms and absence of all `forbidden`
/// terms, with optional case sensitivity.
pub struct KeywordValidator {
    name: String,
    required: Vec<String>,
    forbidden: Vec<String>,
    case_sensitive: bool,
}

impl KeywordValidator {
    pub fn new(name: impl Into<String>, required: Vec<String>, forbidden: Vec<String>, case_sensitive: bool) -> Self {
        Self {
            name: name.into(),
            required,
            forbidden,
            case_sensitive,
        }
    }

    fn contains(&self, haystack: &str, needle: &str) -> bool {
        if self.case_sensitive {
            haystack.contains(needle)
        } else {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }
    }
}

impl Validator for KeywordValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "requires presence of required keywords and absence of forbidden ones"
    }

    fn validate(&self, text: &str) -> ValidationResult {
        let missing: Vec<&String> = self.required.iter().filter(|k| !self.contains(text, k)).collect();
        let present_forbidden: Vec<&String> = self.forbidden.iter().filter(|k| self.contains(text, k)).collect();

        let mut details = serde_json::Map::new();
        details.insert("missing_required".into(), json!(missing));
        details.insert("found_forbidden".into(), json!(present_forbidden));

        if missing.is_empty() && present_forbidden.is_empty() {
            result_with_details(true, "keyword constraints satisfied", details)
        } else {
            let mut parts = Vec::new();
            if !missing.is_empty() {
                parts.push(format!("missing: {}", missing.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")));
            }
            if !present_forbidden.is_empty() {
                parts.push(format!(
                    "forbidden present: {}",
                    present_forbidden.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                ));
            }
            result_with_details(false, parts.join("; "), details)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_when_required_present_and_forbidden_absent() {
        let v = KeywordValidator::new("k", vec!["success".into()], vec!["error".into()], false);
        assert!(v.validate("Task completed: SUCCESS").is_valid);
    }

    #[test]
    fn fails_when_forbidden_term_present() {
        let v = KeywordValidator::new("k", vec![], vec!["traceback".into()], false);
        assert!(!v.validate("Traceback (most recent call last)").is_valid);
    }
}
