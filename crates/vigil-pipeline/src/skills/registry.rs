use std::path::Path;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::base::{Skill, SkillOutcome};

/// Process-wide registry of in-process skills, checked before the Refiner
/// for prompts a skill can answer directly without invoking the executor.
pub struct SkillRegistry {
    skills: Mutex<Vec<Arc<dyn Skill>>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self {
            skills: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, skill: Arc<dyn Skill>) {
        debug!(skill = skill.name(), "registering skill");
        self.skills.lock().unwrap().push(skill);
    }

    pub fn names(&self) -> Vec<String> {
        self.skills
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }

    /// Try each registered skill's detector in registration order, running
    /// the first match.
    pub fn detect_and_run(&self, text: &str, work_dir: &Path) -> Option<SkillOutcome> {
        let skills = self.skills.lock().unwrap();
        for skill in skills.iter() {
            if let Some(args) = skill.detect(text) {
                return Some(skill.run(args, work_dir));
            }
        }
        None
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct AlwaysSkill(&'static str);

    impl Skill for AlwaysSkill {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test skill"
        }
        fn detect(&self, text: &str) -> Option<super::super::base::SkillArgs> {
            text.contains(self.0).then(|| super::super::base::SkillArgs {
                parameter: text.to_string(),
            })
        }
        fn run(&self, _args: super::super::base::SkillArgs, _work_dir: &Path) -> SkillOutcome {
            SkillOutcome {
                success: true,
                summary: format!("ran {}", self.0),
                data: serde_json::Value::Null,
            }
        }
    }

    #[test]
    fn first_matching_skill_wins() {
        let registry = SkillRegistry::new();
        registry.register(Arc::new(AlwaysSkill("alpha")));
        registry.register(Arc::new(AlwaysSkill("beta")));

        let outcome = registry
            .detect_and_run("please run beta now", &PathBuf::from("."))
            .unwrap();
        assert_eq!(outcome.summary, "ran beta");
    }

    #[test]
    fn no_match_returns_none() {
        let registry = SkillRegistry::new();
        registry.register(Arc::new(AlwaysSkill("alpha")));
        assert!(registry
            .detect_and_run("nothing matches here", &PathBuf::from("."))
            .is_none());
    }
}
