use serde_json::json;
use vigil_core::ValidationResult;

use crate::validator::{result_with_details, Validator};

/// Aggregation mode for a `CompositeValidator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    All,
    Any,
}

/// Runs a set of validators and aggregates their verdicts by either
/// "all must pass" or "any may pass" semantics.
pub struct CompositeValidator {
    name: String,
    mode: CompositeMode,
    validators: Vec<Box<dyn Validator>>,
}

impl CompositeValidator {
    pub fn new(name: impl Into<String>, mode: CompositeMode, validators: Vec<Box<dyn Validator>>) -> Self {
        Self {
            name: name.into(),
            mode,
            validators,
        }
    }
}

impl Validator for CompositeValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        match self.mode {
            CompositeMode::All => "passes only if every child validator passes",
            CompositeMode::Any => "passes if any child validator passes",
        }
    }

    fn validate(&self, text: &str) -> ValidationResult {
        let results: Vec<ValidationResult> = self.validators.iter().map(|v| v.validate(text)).collect();
        let is_valid = match self.mode {
            CompositeMode::All => results.iter().all(|r| r.is_valid),
            CompositeMode::Any => results.is_empty() || results.iter().any(|r| r.is_valid),
        };

        let mut details = serde_json::Map::new();
        details.insert(
            "results".into(),
            json!(results
                .iter()
                .zip(self.validators.iter())
                .map(|(r, v)| json!({ "name": v.name(), "is_valid": r.is_valid, "message": r.message }))
                .collect::<Vec<_>>()),
        );

        let message = format!(
            "{}/{} child validators passed",
            results.iter().filter(|r| r.is_valid).count(),
            results.len()
        );
        result_with_details(is_valid, message, details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword_validator::KeywordValidator;

    #[test]
    fn all_mode_requires_every_child_to_pass() {
        let composite = CompositeValidator::new(
            "both",
            CompositeMode::All,
            vec![
                Box::new(KeywordValidator::new("a", vec!["ok".into()], vec![], false)),
                Box::new(KeywordValidator::new("b", vec!["missing-term".into()], vec![], false)),
            ],
        );
        assert!(!composite.validate("ok").is_valid);
    }

    #[test]
    fn any_mode_passes_if_one_child_passes() {
        let composite = CompositeValidator::new(
            "either",
            CompositeMode::Any,
            vec![
                Box::new(KeywordValidator::new("a", vec!["ok".into()], vec![], false)),
                Box::new(KeywordValidator::new("b", vec!["missing-term".into()], vec![], false)),
            ],
        );
        assert!(composite.validate("ok").is_valid);
    }
}
