use std::path::Path;

use serde_json::json;

use super::base::{Skill, SkillArgs, SkillOutcome};

const TRIGGERS: &[&str] = &[
    "system info",
    "系统信息",
    "cpu",
    "memory usage",
    "内存使用",
    "disk usage",
];

/// Reports coarse platform facts available without a native resource-usage
/// dependency. The original falls back to the same reduced set when its
/// optional resource-sampling library isn't installed; this mirrors that
/// degraded path rather than the full reading.
pub struct SystemInfoSkill;

impl Skill for SystemInfoSkill {
    fn name(&self) -> &str {
        "system_info"
    }

    fn description(&self) -> &str {
        "reports platform, architecture, and available CPU parallelism"
    }

    fn detect(&self, text: &str) -> Option<SkillArgs> {
        let lower = text.to_lowercase();
        TRIGGERS
            .iter()
            .any(|t| lower.contains(t))
            .then(|| SkillArgs { parameter: String::new() })
    }

    fn run(&self, _args: SkillArgs, _work_dir: &Path) -> SkillOutcome {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        SkillOutcome {
            success: true,
            summary: format!(
                "{} ({}), {cpus} logical CPUs available",
                std::env::consts::OS,
                std::env::consts::ARCH,
            ),
            data: json!({
                "platform": std::env::consts::OS,
                "architecture": std::env::consts::ARCH,
                "available_parallelism": cpus,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_bilingual_trigger_phrases() {
        let skill = SystemInfoSkill;
        assert!(skill.detect("what's the cpu load").is_some());
        assert!(skill.detect("查看系统信息").is_some());
        assert!(skill.detect("refactor the module").is_none());
    }
}
