use vigil_core::ValidationResult;

/// Something that inspects an executor's collected output and reports
/// whether it satisfies a check. Never alters the task's success flag
/// itself — only records a result for the Reporter to render.
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn validate(&self, text: &str) -> ValidationResult;
}

pub(crate) fn result(is_valid: bool, message: impl Into<String>) -> ValidationResult {
    ValidationResult {
        is_valid,
        message: message.into(),
        details: Default::default(),
    }
}

pub(crate) fn result_with_details(
    is_valid: bool,
    message: impl Into<String>,
    details: serde_json::Map<String, serde_json::Value>,
) -> ValidationResult {
    ValidationResult {
        is_valid,
        message: message.into(),
        details,
    }
}
