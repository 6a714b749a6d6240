/// Coarse classification of a task's prompt, used to pick a heartbeat
/// inactivity threshold — a fixed timeout is hostile to long but
/// legitimately progressing work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    FileOperation,
    CodeGeneration,
    Analysis,
    Refactoring,
    Search,
    Unknown,
}

impl TaskType {
    /// Seconds of output-growth inactivity this task type tolerates before
    /// the Health Monitor begins cancellation.
    pub fn threshold_secs(self) -> u64 {
        match self {
            TaskType::FileOperation => 60,
            TaskType::CodeGeneration => 120,
            TaskType::Analysis => 180,
            TaskType::Refactoring => 240,
            TaskType::Search => 90,
            TaskType::Unknown => 120,
        }
    }
}

const CREATION_WORDS: &[&str] = &["创建", "生成", "write", "create", "generate"];
const FRAMEWORK_WORDS: &[&str] = &["fastapi", "flask", "django", "fastapi项目", "web项目"];
const ANALYSIS_WORDS: &[&str] = &["分析", "review", "analyze", "检查", "审查"];
const REFACTOR_WORDS: &[&str] = &["重构", "refactor", "优化", "optimize", "重写"];
const SEARCH_WORDS: &[&str] = &["搜索", "search", "查找", "find", "定位"];

/// Infer the task's type from its prompt text.
pub fn detect_task_type(prompt: &str) -> TaskType {
    let lower = prompt.to_lowercase();

    if CREATION_WORDS.iter().any(|w| lower.contains(w)) {
        return if FRAMEWORK_WORDS.iter().any(|w| lower.contains(w)) {
            TaskType::CodeGeneration
        } else {
            TaskType::FileOperation
        };
    }
    if ANALYSIS_WORDS.iter().any(|w| lower.contains(w)) {
        return TaskType::Analysis;
    }
    if REFACTOR_WORDS.iter().any(|w| lower.contains(w)) {
        return TaskType::Refactoring;
    }
    if SEARCH_WORDS.iter().any(|w| lower.contains(w)) {
        return TaskType::Search;
    }
    TaskType::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_with_framework_keyword_is_code_generation() {
        assert_eq!(detect_task_type("create a fastapi web project"), TaskType::CodeGeneration);
    }

    #[test]
    fn plain_creation_is_file_operation() {
        assert_eq!(detect_task_type("create a new config file"), TaskType::FileOperation);
    }

    #[test]
    fn analysis_keyword_detected() {
        assert_eq!(detect_task_type("analyze this module for bugs"), TaskType::Analysis);
    }

    #[test]
    fn chinese_refactor_keyword_detected() {
        assert_eq!(detect_task_type("重构这个模块"), TaskType::Refactoring);
    }

    #[test]
    fn search_keyword_detected() {
        assert_eq!(detect_task_type("find where this function is defined"), TaskType::Search);
    }

    #[test]
    fn unrecognized_prompt_is_unknown() {
        assert_eq!(detect_task_type("hello there"), TaskType::Unknown);
    }

    #[test]
    fn threshold_matches_task_type() {
        assert_eq!(TaskType::FileOperation.threshold_secs(), 60);
        assert_eq!(TaskType::Refactoring.threshold_secs(), 240);
    }
}
