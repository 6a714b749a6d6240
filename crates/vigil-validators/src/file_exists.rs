use std::path::{Path, PathBuf};

use serde_json::json;
use vigil_core::ValidationResult;
use vigil_executor::extract_file_paths;

use crate::validator::{result_with_details, Validator};

/// Extracts file paths from the output using the same regex set as the
/// Executor's parser, then checks each plus a configured required-set for
/// existence under `work_dir`.
pub struct FileExistsValidator {
    name: String,
    work_dir: PathBuf,
    required: Vec<String>,
}

impl FileExistsValidator {
    pub fn new(name: impl Into<String>, work_dir: impl Into<PathBuf>, required: Vec<String>) -> Self {
        Self {
            name: name.into(),
            work_dir: work_dir.into(),
            required,
        }
    }
}

impl Validator for FileExistsValidator {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "checks that files mentioned in the output (plus a required set) exist on disk"
    }

    fn validate(&self, text: &str) -> ValidationResult {
        let mentioned: Vec<String> = extract_file_paths(text).into_iter().map(|(p, _)| p).collect();
        let mut candidates = mentioned;
        for req in &self.required {
            if !candidates.contains(req) {
                candidates.push(req.clone());
            }
        }

        let mut found = Vec::new();
        let mut missing = Vec::new();
        for path in &candidates {
            if self.resolve(path).is_file() {
                found.push(path.clone());
            } else {
                missing.push(path.clone());
            }
        }

        let mut details = serde_json::Map::new();
        details.insert("found".into(), json!(found));
        details.insert("missing".into(), json!(missing));

        let is_valid = missing.is_empty();
        let message = if is_valid {
            format!("all {} referenced files exist", found.len())
        } else {
            format!("{} file(s) missing: {}", missing.len(), missing.join(", "))
        };
        result_with_details(is_valid, message, details)
    }
}

impl FileExistsValidator {
    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.work_dir.join(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn reports_missing_and_found_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("exists.txt"), "hi").unwrap();

        let validator = FileExistsValidator::new("files", dir.path(), vec!["missing.txt".into()]);
        let outcome = validator.validate("Created exists.txt");
        assert!(!outcome.is_valid);
        assert_eq!(outcome.message, "1 file(s) missing: missing.txt");
    }

    #[test]
    fn passes_when_everything_mentioned_exists() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}").unwrap();

        let validator = FileExistsValidator::new("files", dir.path(), vec![]);
        let outcome = validator.validate("Wrote to a.rs");
        assert!(outcome.is_valid);
    }
}
