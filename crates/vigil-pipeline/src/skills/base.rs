use std::path::Path;

/// Parameters a skill's detector extracted from the raw prompt.
#[derive(Debug, Clone)]
pub struct SkillArgs {
    pub parameter: String,
}

/// A skill's result, formatted for direct delivery through the Reporter.
#[derive(Debug, Clone)]
pub struct SkillOutcome {
    pub success: bool,
    pub summary: String,
    pub data: serde_json::Value,
}

/// An in-process tool the pipeline can run instead of the executor
/// subprocess when a prompt matches one of its trigger phrases.
pub trait Skill: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Returns `Some` with extracted parameters if `text` matches this
    /// skill's trigger phrases, `None` otherwise.
    fn detect(&self, text: &str) -> Option<SkillArgs>;

    fn run(&self, args: SkillArgs, work_dir: &Path) -> SkillOutcome;
}
