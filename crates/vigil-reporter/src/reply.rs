const CHAT_MAX_CHARS: usize = 3000;
const ERROR_EXCERPT_CHARS: usize = 500;

/// How a task's outcome renders as a short user-facing reply, before
/// channel-specific truncation.
pub enum Outcome<'a> {
    Success { summary: &'a str, artifact_path: &'a str },
    PartialCompletion { stdout: &'a str, artifact_path: &'a str },
    Failure { error: &'a str },
}

/// Format a reply for a channel with a max payload of `max_chars`,
/// appending an ellipsis footer if truncated.
pub fn format_reply(outcome: &Outcome, max_chars: usize) -> String {
    let body = match outcome {
        Outcome::Success { summary, artifact_path } => {
            format!("Done: {summary}\n\nFull report: {artifact_path}")
        }
        Outcome::PartialCompletion { stdout, artifact_path } => {
            format!(
                "Partial completion (interrupted due to inactivity).\n\n{}\n\nFull report: {artifact_path}",
                stdout.trim()
            )
        }
        Outcome::Failure { error } => {
            format!("Task failed: {}", excerpt(error, ERROR_EXCERPT_CHARS))
        }
    };
    truncate_with_footer(&body, max_chars)
}

/// The default chat payload cap (≤3000 chars).
pub fn chat_max_chars() -> usize {
    CHAT_MAX_CHARS
}

fn excerpt(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(cap).collect();
        format!("{truncated}…")
    }
}

fn truncate_with_footer(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let footer = "\n\n… (truncated)";
    let budget = max_chars.saturating_sub(footer.chars().count());
    let truncated: String = text.chars().take(budget).collect();
    format!("{truncated}{footer}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_success_reply_is_untouched() {
        let outcome = Outcome::Success { summary: "added a README", artifact_path: "/reports/task_1.md" };
        let reply = format_reply(&outcome, chat_max_chars());
        assert!(reply.contains("added a README"));
        assert!(!reply.contains("truncated"));
    }

    #[test]
    fn long_reply_is_truncated_with_footer() {
        let summary = "x".repeat(5000);
        let outcome = Outcome::Success { summary: &summary, artifact_path: "/reports/task_1.md" };
        let reply = format_reply(&outcome, chat_max_chars());
        assert!(reply.chars().count() <= chat_max_chars());
        assert!(reply.ends_with("(truncated)"));
    }

    #[test]
    fn failure_excerpt_is_capped_at_500_chars() {
        let error = "e".repeat(800);
        let outcome = Outcome::Failure { error: &error };
        let reply = format_reply(&outcome, chat_max_chars());
        assert!(reply.contains('…'));
    }
}
