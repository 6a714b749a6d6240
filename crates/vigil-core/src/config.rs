use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_LLM_MAX_RETRIES: u32 = 3;
pub const DEFAULT_MODIFIED_FILES_RING: usize = 500;
pub const DEFAULT_SESSION_MAX_MESSAGES: usize = 20;
pub const DEFAULT_MEMORY_TTL_DAYS: i64 = 90;
pub const DEFAULT_PREVIEW_PAUSE_SECS: u64 = 2;
pub const DEFAULT_CHAT_MAX_CHARS: usize = 3000;
pub const DEFAULT_ERROR_EXCERPT_CHARS: usize = 500;

/// Top-level engine configuration (`vigil.toml` + `VIGIL_*` env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            llm: LlmConfig::default(),
            executor: ExecutorConfig::default(),
            supervisor: SupervisorConfig::default(),
            channels: ChannelsConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_state_path")]
    pub state_path: String,
    #[serde(default = "default_memory_db_path")]
    pub memory_db_path: String,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            memory_db_path: default_memory_db_path(),
            reports_dir: default_reports_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout_secs(),
            max_retries: default_llm_max_retries(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Explicit path to the code-generation CLI binary, if known.
    pub cli_path: Option<String>,
    /// Explicit path to the POSIX shell wrapper, if the platform needs one.
    pub shell_path: Option<String>,
    #[serde(default)]
    pub work_dir: Option<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            cli_path: None,
            shell_path: None,
            work_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default)]
    pub enable_notification: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            enable_notification: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    pub chat: Option<ChatChannelConfig>,
    pub mail: Option<MailChannelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChannelConfig {
    pub bot_token: String,
    #[serde(default = "default_chat_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
    #[serde(default)]
    pub allow_list: Vec<String>,
}

fn default_chat_base_url() -> String {
    "https://api.example-chat.com/bot".to_string()
}

fn default_chat_poll_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailChannelConfig {
    pub imap_host: String,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_imap_port() -> u16 {
    993
}
fn default_smtp_port() -> u16 {
    587
}
fn default_subject_prefix() -> String {
    "[Task]".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_recent_task_count")]
    pub recent_task_count: usize,
    #[serde(default = "default_refine_confidence_threshold")]
    pub refine_confidence_threshold: f32,
    #[serde(default = "default_preview_pause_secs")]
    pub preview_pause_secs: u64,
    #[serde(default = "default_session_max_messages")]
    pub session_max_messages: usize,
    #[serde(default = "default_memory_ttl_days")]
    pub memory_ttl_days: i64,
    #[serde(default = "default_modified_files_ring")]
    pub modified_files_ring: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            recent_task_count: default_recent_task_count(),
            refine_confidence_threshold: default_refine_confidence_threshold(),
            preview_pause_secs: default_preview_pause_secs(),
            session_max_messages: default_session_max_messages(),
            memory_ttl_days: default_memory_ttl_days(),
            modified_files_ring: default_modified_files_ring(),
        }
    }
}

fn default_recent_task_count() -> usize {
    5
}
fn default_refine_confidence_threshold() -> f32 {
    0.6
}
fn default_preview_pause_secs() -> u64 {
    DEFAULT_PREVIEW_PAUSE_SECS
}
fn default_session_max_messages() -> usize {
    DEFAULT_SESSION_MAX_MESSAGES
}
fn default_memory_ttl_days() -> i64 {
    DEFAULT_MEMORY_TTL_DAYS
}
fn default_modified_files_ring() -> usize {
    DEFAULT_MODIFIED_FILES_RING
}
fn default_heartbeat_interval_secs() -> u64 {
    DEFAULT_HEARTBEAT_INTERVAL_SECS
}
fn default_llm_timeout_secs() -> u64 {
    DEFAULT_LLM_TIMEOUT_SECS
}
fn default_llm_max_retries() -> u32 {
    DEFAULT_LLM_MAX_RETRIES
}
fn default_llm_base_url() -> String {
    "https://api.anthropic.com".to_string()
}
fn default_llm_model() -> String {
    "claude-sonnet-4-6".to_string()
}

fn storage_root() -> String {
    std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
}

fn default_state_path() -> String {
    format!("{}/.vigil/state.json", storage_root())
}
fn default_memory_db_path() -> String {
    format!("{}/.vigil/memory.db", storage_root())
}
fn default_reports_dir() -> String {
    format!("{}/.vigil/tasks", storage_root())
}

impl VigilConfig {
    /// Load config from a TOML file with `VIGIL_*` env var overrides.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: VigilConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("VIGIL_").split("_"))
            .extract()
            .map_err(|e| crate::error::VigilError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    format!("{}/.vigil/vigil.toml", storage_root())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_thresholds() {
        let cfg = VigilConfig::default();
        assert_eq!(cfg.supervisor.heartbeat_interval_secs, 30);
        assert_eq!(cfg.pipeline.refine_confidence_threshold, 0.6);
        assert_eq!(cfg.pipeline.modified_files_ring, 500);
    }
}
