use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};
use vigil_core::ValidationResult;
use vigil_executor::{Execution, ExecutionHandle};

use crate::task_type::TaskType;

/// Sink for the alert/interrupted notifications the Health Monitor sends
/// around a cancellation. The pipeline wires this to the originating
/// channel's `reply_handle`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

/// An executor run plus whatever validators decided about its output.
/// Validation never changes `execution.success`; it is recorded here for
/// the Reporter to render alongside it.
#[derive(Debug, Clone)]
pub struct MonitoredResult {
    pub execution: vigil_core::ExecutionResult,
    pub validations: Vec<ValidationResult>,
    pub interrupted: bool,
}

pub struct HealthMonitorConfig {
    pub heartbeat_interval: Duration,
    pub enable_notification: bool,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            enable_notification: true,
        }
    }
}

pub struct HealthMonitor {
    config: HealthMonitorConfig,
}

impl HealthMonitor {
    pub fn new(config: HealthMonitorConfig) -> Self {
        Self { config }
    }

    /// Drive `execution` to completion, polling output growth every
    /// heartbeat and cancelling after two consecutive inactive periods once
    /// `task_type`'s threshold has elapsed.
    pub async fn supervise(
        &self,
        execution: Execution,
        task_type: TaskType,
        notifier: Option<&dyn Notifier>,
    ) -> MonitoredResult {
        let threshold = Duration::from_secs(task_type.threshold_secs());
        let handle = execution.handle();
        let started = Instant::now();

        let wait_fut = execution.wait();
        tokio::pin!(wait_fut);

        let mut interval = tokio::time::interval(self.config.heartbeat_interval);
        interval.tick().await; // first tick fires immediately

        let mut inactive_periods: u32 = 0;
        let mut last_seen_len = handle.output_len();
        let mut last_activity = started;

        loop {
            tokio::select! {
                result = &mut wait_fut => {
                    return match result {
                        Ok(execution_result) => {
                            info!(success = execution_result.success, "execution finished under supervision");
                            MonitoredResult { execution: execution_result, validations: Vec::new(), interrupted: false }
                        }
                        Err(e) => MonitoredResult {
                            execution: failed_result(&e.to_string(), started, String::new()),
                            validations: Vec::new(),
                            interrupted: false,
                        },
                    };
                }
                _ = interval.tick() => {
                    let current_len = handle.output_len();
                    if current_len > last_seen_len {
                        last_seen_len = current_len;
                        last_activity = Instant::now();
                        inactive_periods = 0;
                    } else {
                        inactive_periods += 1;
                    }

                    let inactive_for = last_activity.elapsed();
                    if inactive_periods >= 2 && inactive_for >= threshold {
                        warn!(inactive_secs = inactive_for.as_secs(), "task appears unresponsive, cancelling");
                        return self.cancel_and_finish(&handle, &mut wait_fut, notifier, inactive_for, started).await;
                    }
                }
            }
        }
    }

    async fn cancel_and_finish(
        &self,
        handle: &ExecutionHandle,
        wait_fut: &mut (impl std::future::Future<Output = vigil_executor::error::Result<vigil_core::ExecutionResult>> + Unpin),
        notifier: Option<&dyn Notifier>,
        inactive_for: Duration,
        started: Instant,
    ) -> MonitoredResult {
        self.alert(notifier, "task may be stuck or looping; cancelling").await;
        handle.cancel().await;

        let partial_stdout = tokio::time::timeout(self.config.heartbeat_interval, &mut *wait_fut)
            .await
            .ok()
            .and_then(|r| r.ok())
            .map(|r| r.stdout)
            .unwrap_or_default();

        self.alert(notifier, "task interrupted due to inactivity").await;

        MonitoredResult {
            execution: failed_result(
                &format!("no activity for {} seconds", inactive_for.as_secs()),
                started,
                partial_stdout,
            ),
            validations: Vec::new(),
            interrupted: true,
        }
    }

    async fn alert(&self, notifier: Option<&dyn Notifier>, message: &str) {
        if !self.config.enable_notification {
            return;
        }
        if let Some(notifier) = notifier {
            notifier.notify(message).await;
        }
    }
}

fn failed_result(error: &str, started: Instant, stdout: String) -> vigil_core::ExecutionResult {
    vigil_core::ExecutionResult {
        success: false,
        stdout,
        stderr: String::new(),
        exit_code: None,
        duration_seconds: started.elapsed().as_secs_f64(),
        created_files: Vec::new(),
        modified_files: Vec::new(),
        deleted_files: Vec::new(),
        error: Some(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_executor::{ExecutionRequest, Executor};

    struct RecordingNotifier {
        messages: tokio::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, message: &str) {
            self.messages.lock().await.push(message.to_string());
        }
    }

    #[tokio::test]
    async fn quick_process_completes_without_cancellation() {
        let executor = Executor::new(Some("/bin/echo".into()), "echo", None, None);
        let execution = executor
            .spawn(ExecutionRequest {
                prompt: "done".into(),
                session_name: None,
                continue_session: false,
                work_dir: None,
                extra_env: vec![],
            })
            .unwrap();

        let monitor = HealthMonitor::new(HealthMonitorConfig {
            heartbeat_interval: Duration::from_millis(50),
            enable_notification: true,
        });

        let result = monitor.supervise(execution, TaskType::Unknown, None).await;
        assert!(!result.interrupted);
        assert!(result.execution.success);
    }

    #[tokio::test]
    async fn notifier_is_not_invoked_when_process_exits_promptly() {
        let executor = Executor::new(Some("/bin/echo".into()), "echo", None, None);
        let execution = executor
            .spawn(ExecutionRequest {
                prompt: "fine".into(),
                session_name: None,
                continue_session: false,
                work_dir: None,
                extra_env: vec![],
            })
            .unwrap();

        let monitor = HealthMonitor::new(HealthMonitorConfig {
            heartbeat_interval: Duration::from_millis(50),
            enable_notification: true,
        });
        let notifier = RecordingNotifier { messages: tokio::sync::Mutex::new(Vec::new()) };

        monitor.supervise(execution, TaskType::Unknown, Some(&notifier)).await;
        assert!(notifier.messages.lock().await.is_empty());
    }
}
