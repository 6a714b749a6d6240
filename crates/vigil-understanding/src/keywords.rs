use vigil_core::IntentType;

const AFFIRMATIONS: &[&str] = &["ok", "okay", "yes", "go ahead", "好的", "行", "可以", "嗯"];
const NEGATIONS: &[&str] = &["cancel", "stop", "取消", "停止", "算了"];
const CONTINUATIONS: &[&str] = &["continue", "also", "furthermore", "继续", "还有", "然后"];
const MODIFICATIONS: &[&str] = &["change to", "modify", "rewrite", "改", "修改", "换成"];

/// Keyword fallback used when the LLM's JSON response fails to parse.
/// Fixed confidence of 0.5 — lower than any genuine LLM classification.
pub fn classify_fallback(text: &str) -> (IntentType, f32) {
    let lower = text.to_lowercase();

    if text.contains('?') || text.contains('\u{ff1f}') {
        return (IntentType::Clarification, 0.5);
    }
    if contains_any(&lower, text, AFFIRMATIONS) {
        return (IntentType::Confirm, 0.5);
    }
    if contains_any(&lower, text, NEGATIONS) {
        return (IntentType::Cancel, 0.5);
    }
    if contains_any(&lower, text, CONTINUATIONS) {
        return (IntentType::Continue, 0.5);
    }
    if contains_any(&lower, text, MODIFICATIONS) {
        return (IntentType::Modify, 0.5);
    }
    (IntentType::NewTask, 0.5)
}

fn contains_any(lower: &str, original: &str, keywords: &[&str]) -> bool {
    keywords
        .iter()
        .any(|kw| lower.contains(kw) || original.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_mark_means_clarification() {
        let (intent, conf) = classify_fallback("你是谁?");
        assert_eq!(intent, IntentType::Clarification);
        assert_eq!(conf, 0.5);
    }

    #[test]
    fn affirmation_beats_everything_after_it() {
        let (intent, _) = classify_fallback("ok go ahead");
        assert_eq!(intent, IntentType::Confirm);
    }

    #[test]
    fn chinese_negation_maps_to_cancel() {
        let (intent, _) = classify_fallback("算了");
        assert_eq!(intent, IntentType::Cancel);
    }

    #[test]
    fn unmatched_text_defaults_to_new_task() {
        let (intent, _) = classify_fallback("build a rest api in rust");
        assert_eq!(intent, IntentType::NewTask);
    }
}
