use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a task. Channel-prefixed timestamp for chat, provider UID for mail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque principal identifier from the originating channel (chat user id, mail address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderId(pub String);

impl SenderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SenderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SenderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Channel-specific routing token preserved verbatim from ingress to Reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyHandle(pub String);

impl ReplyHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReplyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ReplyHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ReplyHandle {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifies a conversational session (user + agent/platform scope).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A task's canonical lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Once a task reaches a terminal state, it never transitions again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// The transport a message/task originated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Mail,
    Chat,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelKind::Mail => "mail",
            ChannelKind::Chat => "chat",
        };
        write!(f, "{}", s)
    }
}

/// Classifies a user message relative to recent task context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    NewTask,
    Continue,
    Modify,
    Cancel,
    Clarification,
    Confirm,
}

impl fmt::Display for IntentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentType::NewTask => "new_task",
            IntentType::Continue => "continue",
            IntentType::Modify => "modify",
            IntentType::Cancel => "cancel",
            IntentType::Clarification => "clarification",
            IntentType::Confirm => "confirm",
        };
        write!(f, "{}", s)
    }
}

/// Split view of file paths an executor run touched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputFiles {
    #[serde(default)]
    pub created: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub deleted: Vec<String>,
}

/// A task's canonical record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task_id: TaskId,
    pub original_prompt: String,
    #[serde(default)]
    pub refined_prompt: Option<String>,
    pub status: TaskStatus,
    pub sender: SenderId,
    pub channel: ChannelKind,
    pub reply_handle: ReplyHandle,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub intent_type: Option<IntentType>,
    #[serde(default)]
    pub output_files: OutputFiles,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub report_url: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl TaskInfo {
    /// Transition the task's status, enforcing the forward-only terminal invariant.
    ///
    /// Returns `false` (no-op) when the task is already terminal.
    pub fn transition(&mut self, new_status: TaskStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = new_status;
        if new_status == TaskStatus::Processing && self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        if new_status.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        true
    }
}

/// Raw inbound unit from a channel adapter. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel: ChannelKind,
    pub sender: SenderId,
    #[serde(default)]
    pub recipient: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    pub content: String,
    pub raw_content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Output of the Refiner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefinedResult {
    pub refined_prompt: String,
    #[serde(default)]
    pub clarifications: Vec<String>,
    #[serde(default)]
    pub suggested_steps: Vec<String>,
    pub confidence: f32,
    pub intent_type: IntentType,
    pub reasoning: String,
    pub original_prompt: String,
}

/// Output of the Understanding Agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderstandingResult {
    pub intent_type: IntentType,
    pub understanding: String,
    pub should_interrupt: bool,
    pub context_summary: String,
    #[serde(default)]
    pub related_task_id: Option<TaskId>,
    pub confidence: f32,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
}

/// Output of a supervised Executor run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_seconds: f64,
    #[serde(default)]
    pub created_files: Vec<String>,
    #[serde(default)]
    pub modified_files: Vec<String>,
    #[serde(default)]
    pub deleted_files: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Output of a single Validator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// The kind of change a path underwent, as recorded in the file-change ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeKind {
    Created,
    Modified,
    Deleted,
}

/// One entry in the State Store's bounded `modified_files` ring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub file_path: String,
    pub change_type: FileChangeKind,
    pub actor: String,
    pub timestamp: DateTime<Utc>,
}

/// Overall engine health as last recorded in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    Idle,
    Running,
    Error,
}

/// Durable snapshot of the engine's externally-visible progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: String,
    pub last_status: EngineStatus,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub last_error_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_files: Vec<FileChange>,
    #[serde(default)]
    pub completed_tasks_count: u64,
    #[serde(default)]
    pub failed_tasks_count: u64,
    #[serde(default)]
    pub last_task_timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project_context: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub task_queue: Vec<TaskInfo>,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            last_status: EngineStatus::Idle,
            last_error: None,
            last_error_timestamp: None,
            modified_files: Vec::new(),
            completed_tasks_count: 0,
            failed_tasks_count: 0,
            last_task_timestamp: None,
            project_context: serde_json::Map::new(),
            task_queue: Vec::new(),
        }
    }
}

/// A chat role within a session's message history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn in a session's bounded message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Session lifecycle tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Idle,
    Archived,
}

/// A bounded conversational session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: SenderId,
    pub platform: ChannelKind,
    pub status: SessionStatus,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
    #[serde(default)]
    pub context_vars: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Append a message, dropping the oldest non-system message once `max_messages`
    /// is exceeded. A system prompt preserved at index 0 is never dropped.
    pub fn push_message(&mut self, msg: SessionMessage, max_messages: usize) {
        self.messages.push(msg);
        self.updated_at = Utc::now();
        while self.messages.len() > max_messages + 1 {
            let drop_at = if matches!(self.messages.first(), Some(m) if m.role == Role::System) {
                1
            } else {
                0
            };
            if drop_at >= self.messages.len() {
                break;
            }
            self.messages.remove(drop_at);
        }
    }
}

/// Persistent per-task summary written after a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionHistoryRecord {
    pub session_id: SessionId,
    pub user_id: SenderId,
    pub task_summary: String,
    pub outcome: TaskStatus,
    #[serde(default)]
    pub file_changes: Vec<FileChange>,
    pub duration_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

/// Per-user durable preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreference {
    pub user_id: SenderId,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default)]
    pub code_style: Option<String>,
    #[serde(default)]
    pub communication_style: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub custom_settings: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_transition_is_final() {
        let mut task = sample_task();
        assert!(task.transition(TaskStatus::Processing));
        assert!(task.transition(TaskStatus::Completed));
        assert!(!task.transition(TaskStatus::Pending));
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[test]
    fn processing_sets_started_at_once() {
        let mut task = sample_task();
        task.transition(TaskStatus::Processing);
        let first = task.started_at;
        assert!(first.is_some());
    }

    #[test]
    fn session_retains_system_prompt_when_trimming() {
        let mut session = sample_session();
        session.push_message(
            SessionMessage {
                role: Role::System,
                content: "you are an assistant".into(),
                timestamp: Utc::now(),
            },
            2,
        );
        for i in 0..5 {
            session.push_message(
                SessionMessage {
                    role: Role::User,
                    content: format!("msg {i}"),
                    timestamp: Utc::now(),
                },
                2,
            );
        }
        assert!(session.messages.len() <= 3);
        assert_eq!(session.messages[0].role, Role::System);
    }

    fn sample_task() -> TaskInfo {
        TaskInfo {
            task_id: TaskId::new("t1"),
            original_prompt: "do something".into(),
            refined_prompt: None,
            status: TaskStatus::Pending,
            sender: SenderId::from("u1"),
            channel: ChannelKind::Chat,
            reply_handle: ReplyHandle::from("42"),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            confidence: 0.0,
            intent_type: None,
            output_files: OutputFiles::default(),
            error: None,
            report_url: None,
            metadata: HashMap::new(),
        }
    }

    fn sample_session() -> Session {
        Session {
            session_id: SessionId::new(),
            user_id: SenderId::from("u1"),
            platform: ChannelKind::Chat,
            status: SessionStatus::Active,
            messages: Vec::new(),
            context_vars: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
