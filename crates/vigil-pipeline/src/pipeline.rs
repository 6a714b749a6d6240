use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;
use vigil_channels::{ChannelManager, OutboundMessage};
use vigil_core::config::PipelineConfig;
use vigil_core::{
    FileChangeKind, IntentType, InteractionHistoryRecord, Message, OutputFiles, ReplyHandle,
    Role, Session, SessionMessage, TaskInfo, TaskStatus,
};
use vigil_executor::{ExecutionRequest, Executor};
use vigil_memory::{MemoryManager, SessionManager};
use vigil_refiner::{Refiner, RefinerContext};
use vigil_reporter::{chat_max_chars, format_reply, ArtifactGenerator, Outcome};
use vigil_state::StateStore;
use vigil_supervisor::{detect_task_type, HealthMonitor, HealthMonitorConfig, MonitoredResult};
use vigil_understanding::UnderstandingAgent;
use vigil_validators::Validator;

use crate::error::Result;
use crate::notify::ChannelNotifier;
use crate::router;
use crate::skills::SkillRegistry;

/// Everything the Pipeline needs, assembled once at startup by the gateway.
pub struct PipelineDeps {
    pub state: Arc<StateStore>,
    pub sessions: Arc<SessionManager>,
    pub memory: Arc<MemoryManager>,
    pub understanding: UnderstandingAgent,
    pub refiner: Refiner,
    pub executor: Executor,
    pub validators: Vec<Box<dyn Validator>>,
    pub artifacts: ArtifactGenerator,
    pub channels: Arc<AsyncMutex<ChannelManager>>,
    pub skills: SkillRegistry,
    pub config: PipelineConfig,
    pub heartbeat_secs: u64,
    pub enable_notification: bool,
    pub work_dir: PathBuf,
}

/// Drives the per-task orchestration described in the module overview:
/// acquire, understand, refine, execute under supervision, validate, report.
/// One task in flight at a time; channel polling happens independently and
/// only ever enqueues.
pub struct Pipeline {
    state: Arc<StateStore>,
    sessions: Arc<SessionManager>,
    memory: Arc<MemoryManager>,
    understanding: UnderstandingAgent,
    refiner: Refiner,
    executor: Executor,
    validators: Vec<Box<dyn Validator>>,
    artifacts: ArtifactGenerator,
    channels: Arc<AsyncMutex<ChannelManager>>,
    skills: SkillRegistry,
    config: PipelineConfig,
    heartbeat_secs: u64,
    enable_notification: bool,
    work_dir: PathBuf,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        Self {
            state: deps.state,
            sessions: deps.sessions,
            memory: deps.memory,
            understanding: deps.understanding,
            refiner: deps.refiner,
            executor: deps.executor,
            validators: deps.validators,
            artifacts: deps.artifacts,
            channels: deps.channels,
            skills: deps.skills,
            config: deps.config,
            heartbeat_secs: deps.heartbeat_secs,
            enable_notification: deps.enable_notification,
            work_dir: deps.work_dir,
        }
    }

    /// Convert a raw inbound message into a task, record it in the
    /// session's turn history, and enqueue it. Never blocks on processing.
    pub fn ingest(&self, msg: Message) {
        let task = router::route(&msg);
        if let Ok(mut session) = self.sessions.get_or_create(&task.sender, task.channel) {
            let _ = self.sessions.push_message(
                &mut session,
                SessionMessage {
                    role: Role::User,
                    content: msg.content.clone(),
                    timestamp: msg.timestamp,
                },
                self.config.session_max_messages,
            );
        }
        self.state.add_task(task);
    }

    /// Process one task from the queue head, if any is pending. Returns
    /// `true` if a task was taken (regardless of outcome).
    pub async fn run_once(&self) -> bool {
        let Some(task) = self.pop_next_pending() else {
            return false;
        };
        let task_id = task.task_id.clone();
        if let Err(e) = self.process(task).await {
            warn!(task_id = %task_id, error = %e, "pipeline iteration failed");
            self.state.record_error(format!("task {task_id} failed: {e}"), Utc::now());
        }
        true
    }

    fn pop_next_pending(&self) -> Option<TaskInfo> {
        let snapshot = self.state.current();
        let mut task = snapshot
            .task_queue
            .into_iter()
            .find(|t| t.status == TaskStatus::Pending)?;
        task.transition(TaskStatus::Processing);
        self.state.update_task_status(&task.task_id, |t| {
            t.transition(TaskStatus::Processing);
        });
        Some(task)
    }

    fn current_processing_task(&self, exclude: &vigil_core::TaskId) -> Option<TaskInfo> {
        let snapshot = self.state.current();
        snapshot
            .task_queue
            .into_iter()
            .find(|t| &t.task_id != exclude && t.status == TaskStatus::Processing)
    }

    fn recent_tasks(&self, exclude: &vigil_core::TaskId) -> Vec<TaskInfo> {
        let snapshot = self.state.current();
        snapshot
            .task_queue
            .into_iter()
            .filter(|t| &t.task_id != exclude)
            .take(self.config.recent_task_count)
            .collect()
    }

    async fn process(&self, mut task: TaskInfo) -> Result<()> {
        let channel_name = task.channel.to_string();
        let recent = self.recent_tasks(&task.task_id);
        let current = self.current_processing_task(&task.task_id);

        let understanding = self
            .understanding
            .classify(&task.original_prompt, &recent, current.as_ref())
            .await;
        task.intent_type = Some(understanding.intent_type);
        task.confidence = understanding.confidence;
        self.sync_task(&task);

        if understanding.intent_type == IntentType::Confirm {
            if let Some(active) = current {
                let prompt = active
                    .refined_prompt
                    .clone()
                    .unwrap_or_else(|| active.original_prompt.clone());
                let monitored = self.execute_supervised(&active, &prompt).await?;
                self.finish(active, None, monitored).await?;
                self.complete_trivially(task, "confirmed, continuing the active task").await?;
                return Ok(());
            }
        } else if understanding.intent_type == IntentType::Cancel {
            if let Some(active) = current {
                self.state.update_task_status(&active.task_id, |t| {
                    t.transition(TaskStatus::Cancelled);
                });
            }
            self.reply(&channel_name, &task.reply_handle, "task cancelled").await;
            self.complete_trivially(task, "cancelled the active task").await?;
            return Ok(());
        } else if understanding.intent_type == IntentType::Clarification {
            let question = understanding.suggested_questions.join("\n");
            let body = if question.is_empty() {
                "could you clarify what you'd like done?".to_string()
            } else {
                question
            };
            self.reply(&channel_name, &task.reply_handle, &body).await;
            return Ok(());
        }

        if let Some(outcome) = self.skills.detect_and_run(&task.original_prompt, &self.work_dir) {
            self.reply(&channel_name, &task.reply_handle, &outcome.summary).await;
            task.transition(TaskStatus::Completed);
            self.state.update_task_status(&task.task_id, |t| {
                t.transition(TaskStatus::Completed);
            });
            self.append_history(&task, TaskStatus::Completed, 0.0)?;
            return Ok(());
        }

        let refiner_ctx = self.build_refiner_context();
        let refined = self.refiner.refine(&task.original_prompt, &refiner_ctx).await;
        task.refined_prompt = Some(refined.refined_prompt.clone());
        task.confidence = refined.confidence;
        self.sync_task(&task);

        if refined.confidence < self.config.refine_confidence_threshold && !refined.clarifications.is_empty() {
            self.reply(&channel_name, &task.reply_handle, &refined.clarifications.join("\n")).await;
            return Ok(());
        }

        let preview = format!("Working on: {}", refined.refined_prompt);
        self.reply(&channel_name, &task.reply_handle, &preview).await;
        tokio::time::sleep(Duration::from_secs(self.config.preview_pause_secs)).await;

        let monitored = self.execute_supervised(&task, &refined.refined_prompt).await?;
        self.finish(task, Some(&refined), monitored).await?;
        Ok(())
    }

    async fn execute_supervised(&self, task: &TaskInfo, prompt: &str) -> Result<MonitoredResult> {
        let task_type = detect_task_type(prompt);
        let request = ExecutionRequest {
            prompt: prompt.to_string(),
            session_name: Some(format!("vigil-{}", task.sender.as_str())),
            continue_session: false,
            work_dir: Some(self.work_dir.display().to_string()),
            extra_env: Vec::new(),
        };
        let execution = self.executor.spawn(request)?;

        let monitor = HealthMonitor::new(HealthMonitorConfig {
            heartbeat_interval: Duration::from_secs(self.heartbeat_secs),
            enable_notification: self.enable_notification,
        });
        let notifier = ChannelNotifier {
            channels: self.channels.as_ref(),
            channel_name: task.channel.to_string(),
            reply_handle: task.reply_handle.clone(),
        };

        let mut monitored = monitor.supervise(execution, task_type, Some(&notifier)).await;

        // A stall-cancelled run that still produced output is not a clean
        // failure from the user's point of view.
        let looks_like_stall = monitored
            .execution
            .error
            .as_deref()
            .map(|e| e.contains("no activity for"))
            .unwrap_or(false);
        if !monitored.execution.success && looks_like_stall && !monitored.execution.stdout.trim().is_empty() {
            monitored.execution.success = true;
        }

        monitored.validations = self
            .validators
            .iter()
            .map(|v| v.validate(&monitored.execution.stdout))
            .collect();

        Ok(monitored)
    }

    async fn finish(
        &self,
        mut task: TaskInfo,
        refined: Option<&vigil_core::RefinedResult>,
        monitored: MonitoredResult,
    ) -> Result<()> {
        let channel_name = task.channel.to_string();
        task.output_files = OutputFiles {
            created: monitored.execution.created_files.clone(),
            modified: monitored.execution.modified_files.clone(),
            deleted: monitored.execution.deleted_files.clone(),
        };
        task.error = monitored.execution.error.clone();

        let final_status = if monitored.execution.success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        task.transition(final_status);

        let err = task.error.clone();
        let files = task.output_files.clone();
        self.state.update_task_status(&task.task_id, move |t| {
            t.error = err.clone();
            t.output_files = files.clone();
            t.transition(final_status);
        });

        for f in &task.output_files.created {
            self.state.add_file_change(f.clone(), FileChangeKind::Created, "executor", self.config.modified_files_ring);
        }
        for f in &task.output_files.modified {
            self.state.add_file_change(f.clone(), FileChangeKind::Modified, "executor", self.config.modified_files_ring);
        }
        for f in &task.output_files.deleted {
            self.state.add_file_change(f.clone(), FileChangeKind::Deleted, "executor", self.config.modified_files_ring);
        }

        let artifact_path = self.artifacts.generate(&task, refined, Some(&monitored.execution))?;
        task.report_url = Some(artifact_path.display().to_string());
        let artifact_str = task.report_url.clone().unwrap_or_default();

        let outcome = if monitored.interrupted && !monitored.execution.stdout.trim().is_empty() {
            Outcome::PartialCompletion {
                stdout: &monitored.execution.stdout,
                artifact_path: &artifact_str,
            }
        } else if monitored.execution.success {
            Outcome::Success {
                summary: &monitored.execution.stdout,
                artifact_path: &artifact_str,
            }
        } else {
            Outcome::Failure {
                error: task.error.as_deref().unwrap_or("unknown error"),
            }
        };
        let reply_text = format_reply(&outcome, chat_max_chars());
        self.reply(&channel_name, &task.reply_handle, &reply_text).await;

        self.append_history(&task, final_status, monitored.execution.duration_seconds)?;
        Ok(())
    }

    async fn complete_trivially(&self, mut task: TaskInfo, note: &str) -> Result<()> {
        task.refined_prompt = Some(note.to_string());
        task.transition(TaskStatus::Completed);
        self.state.update_task_status(&task.task_id, |t| {
            t.transition(TaskStatus::Completed);
        });
        self.append_history(&task, TaskStatus::Completed, 0.0)?;
        Ok(())
    }

    fn sync_task(&self, task: &TaskInfo) {
        let intent = task.intent_type;
        let confidence = task.confidence;
        let refined = task.refined_prompt.clone();
        self.state.update_task_status(&task.task_id, move |t| {
            t.intent_type = intent;
            t.confidence = confidence;
            t.refined_prompt = refined.clone();
        });
    }

    fn append_history(&self, task: &TaskInfo, outcome: TaskStatus, duration_seconds: f64) -> Result<()> {
        let session = self.session_for(task)?;
        let record = InteractionHistoryRecord {
            session_id: session.session_id,
            user_id: task.sender.clone(),
            task_summary: task.refined_prompt.clone().unwrap_or_else(|| task.original_prompt.clone()),
            outcome,
            file_changes: Vec::new(),
            duration_seconds,
            timestamp: Utc::now(),
        };
        self.memory.append_interaction_history(&record)?;
        Ok(())
    }

    fn session_for(&self, task: &TaskInfo) -> Result<Session> {
        Ok(self.sessions.get_or_create(&task.sender, task.channel)?)
    }

    fn build_refiner_context(&self) -> RefinerContext {
        let snapshot = self.state.current();
        RefinerContext {
            system_status: format!("{:?}", snapshot.last_status),
            recent_error: snapshot.last_error.clone(),
            recent_file_changes: snapshot
                .modified_files
                .iter()
                .rev()
                .take(5)
                .map(|f| f.file_path.clone())
                .collect(),
            session_stats: format!("{} open task(s)", snapshot.task_queue.len()),
        }
    }

    async fn reply(&self, channel_name: &str, reply_handle: &ReplyHandle, content: &str) {
        let channels = self.channels.lock().await;
        let Some(channel) = channels.get(channel_name) else {
            warn!(channel = channel_name, "cannot reply, channel is not registered");
            return;
        };
        let outbound = OutboundMessage::plain(reply_handle.clone(), content);
        if let Err(e) = channel.send(&outbound).await {
            self.state.record_error(format!("reply send failed: {e}"), Utc::now());
        }
    }
}
