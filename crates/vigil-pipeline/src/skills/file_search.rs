use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use super::base::{Skill, SkillArgs, SkillOutcome};

const MAX_RESULTS: usize = 100;

static TRIGGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(find|search for|查找|搜索)\s+(?:all\s+)?(?:files?|文件)").unwrap());
static GLOB_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[*?][\w.\-/*]*").unwrap());

/// Searches file names by glob-like pattern under the task's working
/// directory, purely in-process (no subprocess launched).
pub struct FileSearchSkill;

impl Skill for FileSearchSkill {
    fn name(&self) -> &str {
        "file_search"
    }

    fn description(&self) -> &str {
        "searches files by name pattern under the working directory"
    }

    fn detect(&self, text: &str) -> Option<SkillArgs> {
        if !TRIGGER.is_match(text) {
            return None;
        }
        let pattern = GLOB_PATTERN
            .find(text)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| "*".to_string());
        Some(SkillArgs { parameter: pattern })
    }

    fn run(&self, args: SkillArgs, work_dir: &Path) -> SkillOutcome {
        let regex = match glob_to_regex(&args.parameter) {
            Ok(r) => r,
            Err(e) => {
                return SkillOutcome {
                    success: false,
                    summary: format!("invalid pattern '{}': {e}", args.parameter),
                    data: json!({"pattern": args.parameter}),
                };
            }
        };

        let mut matches = Vec::new();
        walk(work_dir, &regex, &mut matches);

        let summary = if matches.is_empty() {
            format!("no files matched '{}'", args.parameter)
        } else {
            format!("found {} file(s) matching '{}'", matches.len(), args.parameter)
        };

        SkillOutcome {
            success: true,
            summary,
            data: json!({
                "pattern": args.parameter,
                "matches": matches,
                "count": matches.len(),
            }),
        }
    }
}

fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut escaped = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => escaped.push_str(".*"),
            '?' => escaped.push('.'),
            c => escaped.push_str(&regex::escape(&c.to_string())),
        }
    }
    escaped.push('$');
    Regex::new(&escaped)
}

fn walk(dir: &Path, pattern: &Regex, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        if out.len() >= MAX_RESULTS {
            return;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if path.is_dir() {
            walk(&path, pattern, out);
        } else if pattern.is_match(&name) {
            out.push(path.display().to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn detects_and_runs_against_a_temp_tree() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "").unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();

        let skill = FileSearchSkill;
        let args = skill.detect("find files *.py please").unwrap();
        let outcome = skill.run(args, dir.path());
        assert!(outcome.success);
        assert!(outcome.summary.contains("1 file"));
    }

    #[test]
    fn non_matching_text_is_not_detected() {
        let skill = FileSearchSkill;
        assert!(skill.detect("refactor the parser module").is_none());
    }
}
