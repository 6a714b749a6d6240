use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;
use vigil_core::{IntentType, RefinedResult};
use vigil_llm::{ChatMessage, ChatRequest, LlmProvider};

use crate::normalize::normalize;

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```(?:json)?\s*|```\s*$").unwrap());

const SYSTEM_PROMPT: &str = "You rewrite a user's request into a precise imperative instruction \
for an autonomous coding agent. Respond with JSON only: {\"refined_prompt\": string, \
\"clarifications\": array of strings, \"suggested_steps\": array of strings, \
\"confidence\": number 0-1, \"intent_type\": one of new_task|continue|modify|cancel|clarification|confirm, \
\"reasoning\": string}.";

#[derive(Deserialize)]
struct RawRefined {
    refined_prompt: String,
    #[serde(default)]
    clarifications: Vec<String>,
    #[serde(default)]
    suggested_steps: Vec<String>,
    confidence: f32,
    #[serde(default)]
    intent_type: Option<String>,
    #[serde(default)]
    reasoning: String,
}

/// Rendered system context (status, recent error, recent file changes,
/// per-session stats) supplied to the LLM pass alongside the normalized text.
pub struct RefinerContext {
    pub system_status: String,
    pub recent_error: Option<String>,
    pub recent_file_changes: Vec<String>,
    pub session_stats: String,
}

pub struct Refiner {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl Refiner {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    pub async fn refine(&self, raw_prompt: &str, ctx: &RefinerContext) -> RefinedResult {
        let normalized = normalize(raw_prompt);

        let context_block = format!(
            "System status: {}\nRecent error: {}\nRecent file changes: {}\nSession stats: {}\nTimestamp: {}",
            ctx.system_status,
            ctx.recent_error.as_deref().unwrap_or("none"),
            ctx.recent_file_changes.join(", "),
            ctx.session_stats,
            Utc::now().to_rfc3339(),
        );

        let req = ChatRequest::new(
            self.model.clone(),
            vec![
                ChatMessage {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: format!("{context_block}\n\nUser request: {normalized}"),
                },
            ],
        );

        let response_text = match self.llm.complete(&req).await {
            Ok(resp) => resp.content,
            Err(e) => {
                warn!(error = %e, "refiner LLM call failed, passing normalized prompt through");
                return raw_passthrough(&normalized, raw_prompt);
            }
        };

        match parse_refined(&response_text, raw_prompt) {
            Some(result) => result,
            None => {
                warn!("refiner LLM response failed to parse, using raw text as refined_prompt");
                RefinedResult {
                    refined_prompt: response_text,
                    clarifications: Vec::new(),
                    suggested_steps: Vec::new(),
                    confidence: 0.5,
                    intent_type: IntentType::NewTask,
                    reasoning: "parse failure, used raw LLM text".to_string(),
                    original_prompt: raw_prompt.to_string(),
                }
            }
        }
    }
}

fn parse_refined(text: &str, original_prompt: &str) -> Option<RefinedResult> {
    let stripped = JSON_FENCE.replace_all(text.trim(), "");
    let raw: RawRefined = serde_json::from_str(stripped.trim()).ok()?;

    let intent_type = match raw.intent_type.as_deref() {
        Some("new_task") => IntentType::NewTask,
        Some("continue") => IntentType::Continue,
        Some("modify") => IntentType::Modify,
        Some("cancel") => IntentType::Cancel,
        Some("clarification") => IntentType::Clarification,
        Some("confirm") => IntentType::Confirm,
        _ => IntentType::NewTask,
    };

    Some(RefinedResult {
        refined_prompt: raw.refined_prompt,
        clarifications: raw.clarifications,
        suggested_steps: raw.suggested_steps,
        confidence: raw.confidence,
        intent_type,
        reasoning: raw.reasoning,
        original_prompt: original_prompt.to_string(),
    })
}

fn raw_passthrough(normalized: &str, original_prompt: &str) -> RefinedResult {
    RefinedResult {
        refined_prompt: normalized.to_string(),
        clarifications: Vec::new(),
        suggested_steps: Vec::new(),
        confidence: 0.5,
        intent_type: IntentType::NewTask,
        reasoning: "LLM unavailable, passed normalized prompt through".to_string(),
        original_prompt: original_prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_json() {
        let text = r#"{"refined_prompt":"Add unit tests for parser.rs","clarifications":[],"suggested_steps":["write tests"],"confidence":0.9,"intent_type":"new_task","reasoning":"clear request"}"#;
        let result = parse_refined(text, "add tests pls").unwrap();
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.refined_prompt, "Add unit tests for parser.rs");
    }

    #[test]
    fn unparseable_json_returns_none() {
        assert!(parse_refined("not json at all", "x").is_none());
    }
}
