use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use vigil_core::{FileChangeKind, OutputFiles};

/// Extracted from the executor's combined stdout+stderr. The Executor and
/// the file-exists Validator share this exact table rather than maintaining
/// two copies.
static CREATED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r#"(?i)created\s+['"]?([^\s'"]+\.[a-zA-Z0-9_]+)"#).unwrap(),
        Regex::new(r"(?i)new file[:\s]+(\S+)").unwrap(),
        Regex::new(r"(?i)wrote to (\S+)").unwrap(),
        Regex::new(r"(?i)saved (\S+)").unwrap(),
        Regex::new(r"([a-zA-Z0-9_\-/]+\.[a-zA-Z0-9_]+)\s+created").unwrap(),
    ]
});

static MODIFIED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)modified (\S+)").unwrap(),
        Regex::new(r"(?i)updated (\S+)").unwrap(),
        Regex::new(r"(?i)changed (\S+)").unwrap(),
    ]
});

static DELETED_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)deleted (\S+)").unwrap(),
        Regex::new(r"(?i)removed (\S+)").unwrap(),
    ]
});

fn extract_with(patterns: &[Regex], text: &str, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    for re in patterns {
        for cap in re.captures_iter(text) {
            if let Some(m) = cap.get(1) {
                let path = m.as_str().trim_end_matches(|c| c == '.' || c == ',' || c == ')');
                if path.starts_with("http") {
                    continue;
                }
                if seen.insert(path.to_string()) {
                    out.push(path.to_string());
                }
            }
        }
    }
}

/// Scan combined output for created/modified/deleted file-path hints.
/// Duplicates are removed preserving first-seen order, matching the
/// original's `dict.fromkeys` dedup idiom.
pub fn extract_file_changes(combined_output: &str) -> OutputFiles {
    let mut seen = HashSet::new();
    let mut created = Vec::new();
    let mut modified = Vec::new();
    let mut deleted = Vec::new();

    extract_with(&CREATED_PATTERNS, combined_output, &mut seen, &mut created);
    extract_with(&MODIFIED_PATTERNS, combined_output, &mut seen, &mut modified);
    extract_with(&DELETED_PATTERNS, combined_output, &mut seen, &mut deleted);

    OutputFiles {
        created,
        modified,
        deleted,
    }
}

/// Flat list of every path mentioned, tagged with its change kind, in
/// first-seen order — used by the file-exists validator.
pub fn extract_file_paths(combined_output: &str) -> Vec<(String, FileChangeKind)> {
    let files = extract_file_changes(combined_output);
    files
        .created
        .into_iter()
        .map(|p| (p, FileChangeKind::Created))
        .chain(files.modified.into_iter().map(|p| (p, FileChangeKind::Modified)))
        .chain(files.deleted.into_iter().map(|p| (p, FileChangeKind::Deleted)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_created_file_from_wrote_to() {
        let out = extract_file_changes("Wrote to src/main.rs successfully");
        assert_eq!(out.created, vec!["src/main.rs".to_string()]);
    }

    #[test]
    fn extracts_modified_and_deleted() {
        let out = extract_file_changes("Modified lib.rs\nDeleted old.rs");
        assert_eq!(out.modified, vec!["lib.rs".to_string()]);
        assert_eq!(out.deleted, vec!["old.rs".to_string()]);
    }

    #[test]
    fn http_urls_are_discarded() {
        let out = extract_file_changes("Created http://example.com/file.txt");
        assert!(out.created.is_empty());
    }

    #[test]
    fn duplicates_are_removed_preserving_first_seen_order() {
        let out = extract_file_changes("Created a.py\nSaved a.py\nCreated b.py");
        assert_eq!(out.created, vec!["a.py".to_string(), "b.py".to_string()]);
    }
}
