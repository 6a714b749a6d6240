use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;
use vigil_core::{IntentType, TaskInfo, UnderstandingResult};
use vigil_llm::{ChatMessage, ChatRequest, LlmProvider};

use crate::keywords::classify_fallback;

static JSON_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^```(?:json)?\s*|```\s*$").unwrap());

const SYSTEM_PROMPT: &str = "You classify a user's message against recent task context. \
Respond with JSON only: {\"intent_type\": one of new_task|continue|modify|cancel|clarification|confirm, \
\"understanding\": one-sentence restatement, \"should_interrupt\": bool, \"context_summary\": string, \
\"related_task_id\": string or null, \"confidence\": number 0-1, \"suggested_questions\": array of strings}.";

#[derive(Deserialize)]
struct RawUnderstanding {
    intent_type: String,
    understanding: String,
    #[serde(default)]
    should_interrupt: bool,
    #[serde(default)]
    context_summary: String,
    #[serde(default)]
    related_task_id: Option<String>,
    confidence: f32,
    #[serde(default)]
    suggested_questions: Vec<String>,
}

/// Classifies a raw prompt against recent task context into an
/// [`UnderstandingResult`], via an LLM with a keyword-heuristic fallback.
pub struct UnderstandingAgent {
    llm: Arc<dyn LlmProvider>,
    model: String,
}

impl UnderstandingAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    pub async fn classify(
        &self,
        raw_prompt: &str,
        recent_tasks: &[TaskInfo],
        current_task: Option<&TaskInfo>,
    ) -> UnderstandingResult {
        let context = build_context_block(recent_tasks, current_task);
        let req = ChatRequest::new(
            self.model.clone(),
            vec![
                ChatMessage {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: format!("{context}\n\nMessage: {raw_prompt}"),
                },
            ],
        );

        let response_text = match self.llm.complete(&req).await {
            Ok(resp) => resp.content,
            Err(e) => {
                warn!(error = %e, "understanding LLM call failed, using keyword fallback");
                return fallback_result(raw_prompt, current_task);
            }
        };

        match parse_understanding(&response_text) {
            Some(result) => result,
            None => {
                warn!("understanding LLM response failed to parse, using keyword fallback");
                fallback_result(raw_prompt, current_task)
            }
        }
    }
}

fn parse_understanding(text: &str) -> Option<UnderstandingResult> {
    let stripped = JSON_FENCE.replace_all(text.trim(), "");
    let raw: RawUnderstanding = serde_json::from_str(stripped.trim()).ok()?;

    let intent_type = match raw.intent_type.as_str() {
        "new_task" => IntentType::NewTask,
        "continue" => IntentType::Continue,
        "modify" => IntentType::Modify,
        "cancel" => IntentType::Cancel,
        "clarification" => IntentType::Clarification,
        "confirm" => IntentType::Confirm,
        _ => return None,
    };

    Some(UnderstandingResult {
        intent_type,
        understanding: raw.understanding,
        // if there's no currently-processing task, should_interrupt is meaningless
        should_interrupt: raw.should_interrupt,
        context_summary: raw.context_summary,
        related_task_id: raw.related_task_id.map(|s| vigil_core::TaskId::new(s)),
        confidence: raw.confidence,
        suggested_questions: raw.suggested_questions,
    })
}

fn fallback_result(raw_prompt: &str, current_task: Option<&TaskInfo>) -> UnderstandingResult {
    let (intent_type, confidence) = classify_fallback(raw_prompt);
    UnderstandingResult {
        intent_type,
        understanding: raw_prompt.chars().take(120).collect(),
        should_interrupt: false,
        context_summary: String::new(),
        related_task_id: current_task.map(|t| t.task_id.clone()),
        confidence,
        suggested_questions: Vec::new(),
    }
}

fn build_context_block(recent_tasks: &[TaskInfo], current_task: Option<&TaskInfo>) -> String {
    let mut block = String::new();
    if let Some(task) = current_task {
        block.push_str(&format!(
            "Current task ({}): {} [{}]\n",
            task.task_id, task.original_prompt, task.status
        ));
    } else {
        block.push_str("Current task: none\n");
    }

    block.push_str("Recent tasks:\n");
    for task in recent_tasks {
        block.push_str(&format!(
            "- {}: {} [{}]\n",
            task.task_id, task.original_prompt, task.status
        ));
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_code_fence_and_json_marker() {
        let text = "```json\n{\"intent_type\":\"confirm\",\"understanding\":\"ok\",\"should_interrupt\":false,\"context_summary\":\"\",\"related_task_id\":null,\"confidence\":0.9,\"suggested_questions\":[]}\n```";
        let result = parse_understanding(text).unwrap();
        assert_eq!(result.intent_type, IntentType::Confirm);
        assert_eq!(result.confidence, 0.9);
    }

    #[test]
    fn unknown_intent_value_fails_to_parse() {
        let text = r#"{"intent_type":"unknown_value","understanding":"x","confidence":0.5}"#;
        assert!(parse_understanding(text).is_none());
    }
}
