use regex::{Regex, RegexBuilder};
use vigil_core::ValidationResult;

use crate::error::Result;
use crate::validator::{result, Validator};

/// Matches a compiled pattern against the executor's output text.
pub struct RegexValidator {
    name: String,
    pattern: Regex,
    required: bool,
}

impl RegexValidator {
    pub fn new(name: impl Into<String>, pattern: &str, case_insensitive: bool, required: bool) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(case_insensitive).build()?;
        Ok(Self {
            name: name.into(),
            pattern,
            required,
        })
    }
}

impl Validator for RegexValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "matches a configured regex pattern against the output"
    }

    fn validate(&self, text: &str) -> ValidationResult {
        if text.trim().is_empty() && !self.required {
            return result(true, "output is empty and the pattern is not required");
        }
        if self.pattern.is_match(text) {
            result(true, format!("pattern `{}` matched", self.pattern.as_str()))
        } else {
            result(false, format!("pattern `{}` did not match", self.pattern.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_pattern_in_output() {
        let v = RegexValidator::new("has-success", r"(?i)build succeeded", false, true).unwrap();
        assert!(v.validate("Build succeeded in 3s").is_valid);
    }

    #[test]
    fn empty_output_passes_when_not_required() {
        let v = RegexValidator::new("optional", r"warning", false, false).unwrap();
        assert!(v.validate("").is_valid);
    }

    #[test]
    fn empty_output_fails_when_required() {
        let v = RegexValidator::new("must-match", r"warning", false, true).unwrap();
        assert!(!v.validate("").is_valid);
    }
}
