use std::path::{Path, PathBuf};

use chrono::Utc;
use vigil_core::{ExecutionResult, RefinedResult, TaskInfo, TaskStatus};

use crate::error::Result;

const STDOUT_CAP: usize = 5000;
const STDERR_CAP: usize = 2000;

/// Writes a Markdown artifact per task (metadata, prompts, step list,
/// file-change table, output excerpts, error box, timestamp footer) under
/// `reports_dir`, and appends a row to the project-level `TASK_LOG.md`.
pub struct ArtifactGenerator {
    reports_dir: PathBuf,
}

impl ArtifactGenerator {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    /// Render and write the artifact for a completed task, returning its path.
    pub fn generate(&self, task: &TaskInfo, refined: Option<&RefinedResult>, execution: Option<&ExecutionResult>) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.reports_dir)?;
        let path = self.path_for(task);
        let content = render_markdown(task, refined, execution);
        std::fs::write(&path, content)?;
        self.append_index(task, &path)?;
        Ok(path)
    }

    fn path_for(&self, task: &TaskInfo) -> PathBuf {
        let date_prefix = task.created_at.format("%Y%m%d");
        self.reports_dir.join(format!("task_{date_prefix}_{}.md", task.task_id.as_str()))
    }

    fn append_index(&self, task: &TaskInfo, artifact_path: &Path) -> Result<()> {
        let index_path = self.reports_dir.join("TASK_LOG.md");
        let needs_header = !index_path.exists();
        let mut contents = String::new();
        if needs_header {
            contents.push_str("| Task ID | Status | Created | Artifact |\n");
            contents.push_str("|---------|--------|---------|----------|\n");
        }
        contents.push_str(&format!(
            "| {} | {} | {} | [{}]({}) |\n",
            task.task_id,
            status_label(task.status),
            task.created_at.format("%Y-%m-%d %H:%M:%S"),
            artifact_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            artifact_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
        ));

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(index_path)?;
        file.write_all(contents.as_bytes())?;
        Ok(())
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Processing => "processing",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn render_markdown(task: &TaskInfo, refined: Option<&RefinedResult>, execution: Option<&ExecutionResult>) -> String {
    let mut lines = Vec::new();

    lines.push(format!("# Task: {}", task.task_id));
    lines.push(String::new());
    lines.push("## Summary".to_string());
    lines.push(format!("- **Task ID**: `{}`", task.task_id));
    lines.push(format!("- **Created**: {}", task.created_at.to_rfc3339()));
    lines.push(format!(
        "- **Started**: {}",
        task.started_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "N/A".into())
    ));
    lines.push(format!(
        "- **Completed**: {}",
        task.completed_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "N/A".into())
    ));
    lines.push(format!("- **Status**: {}", status_label(task.status)));
    lines.push(format!("- **Confidence**: {:.0}%", task.confidence * 100.0));
    lines.push(format!("- **Sender**: `{}`", task.sender));
    lines.push(String::new());

    lines.push("## Original request".to_string());
    lines.push(format!("> {}", task.original_prompt));
    lines.push(String::new());

    if let Some(refined_prompt) = &task.refined_prompt {
        lines.push("## Refined instruction".to_string());
        lines.push(format!("> {refined_prompt}"));
        lines.push(String::new());
    }

    if let Some(refined) = refined {
        if !refined.suggested_steps.is_empty() {
            lines.push("## Suggested steps".to_string());
            for (i, step) in refined.suggested_steps.iter().enumerate() {
                lines.push(format!("{}. {step}", i + 1));
            }
            lines.push(String::new());
        }
        if !refined.clarifications.is_empty() {
            lines.push("## Clarifications requested".to_string());
            for (i, q) in refined.clarifications.iter().enumerate() {
                lines.push(format!("{}. {q}", i + 1));
            }
            lines.push(String::new());
        }
    }

    let total_files = task.output_files.created.len() + task.output_files.modified.len() + task.output_files.deleted.len();
    if total_files > 0 {
        lines.push("## File changes".to_string());
        lines.push("| File | Change |".to_string());
        lines.push("|------|--------|".to_string());
        for f in &task.output_files.created {
            lines.push(format!("| `{f}` | created |"));
        }
        for f in &task.output_files.modified {
            lines.push(format!("| `{f}` | modified |"));
        }
        for f in &task.output_files.deleted {
            lines.push(format!("| `{f}` | deleted |"));
        }
        lines.push(String::new());
    }

    if let Some(exec) = execution {
        lines.push("## Execution result".to_string());
        lines.push(format!("- **Exit code**: `{}`", exec.exit_code.map(|c| c.to_string()).unwrap_or_else(|| "N/A".into())));
        lines.push(format!("- **Duration**: {:.1}s", exec.duration_seconds));
        lines.push(String::new());

        if !exec.stdout.is_empty() {
            lines.push("### stdout".to_string());
            lines.push("```".to_string());
            lines.push(truncate(&exec.stdout, STDOUT_CAP));
            lines.push("```".to_string());
            lines.push(String::new());
        }
        if !exec.stderr.is_empty() {
            lines.push("### stderr".to_string());
            lines.push("```".to_string());
            lines.push(truncate(&exec.stderr, STDERR_CAP));
            lines.push("```".to_string());
            lines.push(String::new());
        }
    }

    if let Some(error) = &task.error {
        lines.push("### Error".to_string());
        lines.push("```".to_string());
        lines.push(error.clone());
        lines.push("```".to_string());
        lines.push(String::new());
    }

    lines.push(format!("---\ngenerated {}", Utc::now().to_rfc3339()));
    lines.join("\n")
}

fn truncate(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        text.to_string()
    } else {
        format!("{}\n... (output truncated)", &text[..cap])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::{ChannelKind, OutputFiles, ReplyHandle, SenderId, TaskId};

    fn sample_task() -> TaskInfo {
        TaskInfo {
            task_id: TaskId::new("task-1"),
            original_prompt: "add a readme".into(),
            refined_prompt: Some("Add a README.md summarizing the project".into()),
            status: TaskStatus::Completed,
            sender: SenderId::from("user-1"),
            channel: ChannelKind::Chat,
            reply_handle: ReplyHandle::from("chat-1"),
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: Some(Utc::now()),
            confidence: 0.9,
            intent_type: None,
            output_files: OutputFiles {
                created: vec!["README.md".into()],
                modified: vec![],
                deleted: vec![],
            },
            error: None,
            report_url: None,
            metadata: Default::default(),
        }
    }

    #[test]
    fn generate_writes_markdown_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let gen = ArtifactGenerator::new(dir.path());
        let task = sample_task();
        let path = gen.generate(&task, None, None).unwrap();
        assert!(path.exists());
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("README.md"));
        assert!(dir.path().join("TASK_LOG.md").exists());
    }

    #[test]
    fn long_stdout_is_truncated() {
        let truncated = truncate(&"x".repeat(6000), STDOUT_CAP);
        assert!(truncated.contains("truncated"));
    }
}
