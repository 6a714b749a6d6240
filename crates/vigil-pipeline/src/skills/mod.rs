pub mod base;
pub mod calculator;
pub mod file_search;
pub mod registry;
pub mod system_info;

pub use base::{Skill, SkillArgs, SkillOutcome};
pub use calculator::CalculatorSkill;
pub use file_search::FileSearchSkill;
pub use registry::SkillRegistry;
pub use system_info::SystemInfoSkill;
