use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{info, warn};
use vigil_core::ExecutionResult;

use crate::error::{ExecutorError, Result};
use crate::file_changes::extract_file_changes;
use crate::resolve::resolve_binary;

/// Run-time options for a single execution, composed by the pipeline from
/// config + the current task's session.
pub struct ExecutionRequest {
    pub prompt: String,
    pub session_name: Option<String>,
    pub continue_session: bool,
    pub work_dir: Option<String>,
    pub extra_env: Vec<(String, String)>,
}

/// A running subprocess with a shared output-length counter the supervisor
/// polls for liveness, and a cancellation handle it can use without waiting
/// on the driver task.
pub struct Execution {
    output_len: Arc<AtomicUsize>,
    child: Arc<Mutex<Option<Child>>>,
    handle: tokio::task::JoinHandle<Result<ExecutionResult>>,
}

/// A cloneable reference to a running `Execution`'s liveness state, usable
/// after `wait()` has consumed the `Execution` itself.
#[derive(Clone)]
pub struct ExecutionHandle {
    output_len: Arc<AtomicUsize>,
    child: Arc<Mutex<Option<Child>>>,
}

impl ExecutionHandle {
    pub fn output_len(&self) -> usize {
        self.output_len.load(Ordering::Relaxed)
    }

    pub async fn cancel(&self) {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to send kill to subprocess");
            }
        }
    }
}

impl Execution {
    pub fn output_len(&self) -> usize {
        self.output_len.load(Ordering::Relaxed)
    }

    /// A cloneable handle for polling/cancelling after `wait()` takes `self`.
    pub fn handle(&self) -> ExecutionHandle {
        ExecutionHandle {
            output_len: self.output_len.clone(),
            child: self.child.clone(),
        }
    }

    /// Ask the subprocess to terminate. Safe to call more than once; a
    /// no-op once the driver task has already reaped the child.
    pub async fn cancel(&self) {
        let mut guard = self.child.lock().await;
        if let Some(child) = guard.as_mut() {
            if let Err(e) = child.start_kill() {
                warn!(error = %e, "failed to send kill to subprocess");
            }
        }
    }

    /// Wait for the driver task to finish, returning the final result.
    pub async fn wait(self) -> Result<ExecutionResult> {
        self.handle
            .await
            .map_err(|e| ExecutorError::Spawn(std::io::Error::other(e.to_string())))?
    }
}

pub struct Executor {
    cli_path: Option<String>,
    bin_name: String,
    shell_path: Option<String>,
    default_work_dir: Option<String>,
}

impl Executor {
    pub fn new(
        cli_path: Option<String>,
        bin_name: impl Into<String>,
        shell_path: Option<String>,
        default_work_dir: Option<String>,
    ) -> Self {
        Self {
            cli_path,
            bin_name: bin_name.into(),
            shell_path,
            default_work_dir,
        }
    }

    /// Spawn the code-generation CLI, returning a handle the supervisor can
    /// poll and cancel while the prompt runs.
    pub fn spawn(&self, req: ExecutionRequest) -> Result<Execution> {
        let binary = resolve_binary(self.cli_path.as_deref(), &self.bin_name)
            .ok_or(ExecutorError::BinaryNotFound)?;

        let mut cmd = Command::new(&binary);
        cmd.arg("-p");
        if req.continue_session {
            cmd.arg("--continue");
        }
        if let Some(session) = &req.session_name {
            cmd.arg(format!("--session={session}"));
        }
        cmd.arg(&req.prompt);

        let work_dir = req.work_dir.as_deref().or(self.default_work_dir.as_deref());
        if let Some(dir) = work_dir {
            cmd.current_dir(dir);
        }

        if let Some(shell) = &self.shell_path {
            cmd.env("SHELL", shell);
        }
        cmd.env("CI", "true");
        cmd.env("NONINTERACTIVE", "1");
        for (k, v) in &req.extra_env {
            cmd.env(k, v);
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let output_len = Arc::new(AtomicUsize::new(0));
        let child_slot = Arc::new(Mutex::new(Some(child)));

        let output_len_task = output_len.clone();
        let child_slot_task = child_slot.clone();
        let prompt = req.prompt.clone();
        let started_at = Utc::now();

        let handle = tokio::spawn(async move {
            let combined = Arc::new(Mutex::new(Vec::new()));

            let stdout_task = stdout.map(|mut out| {
                let combined = combined.clone();
                let output_len_task = output_len_task.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    loop {
                        let n = out.read(&mut buf).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        let mut guard = combined.lock().await;
                        guard.extend_from_slice(&buf[..n]);
                        output_len_task.store(guard.len(), Ordering::Relaxed);
                    }
                })
            });

            let stderr_task = stderr.map(|mut err| {
                let combined = combined.clone();
                let output_len_task = output_len_task.clone();
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    loop {
                        let n = err.read(&mut buf).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        let mut guard = combined.lock().await;
                        guard.extend_from_slice(&buf[..n]);
                        output_len_task.store(guard.len(), Ordering::Relaxed);
                    }
                })
            });

            if let Some(t) = stdout_task {
                let _ = t.await;
            }
            if let Some(t) = stderr_task {
                let _ = t.await;
            }

            let exit_status = {
                let mut guard = child_slot_task.lock().await;
                match guard.as_mut() {
                    Some(child) => child.wait().await?,
                    None => return Err(ExecutorError::BinaryNotFound),
                }
            };
            child_slot_task.lock().await.take();

            let bytes = combined.lock().await;
            let output = String::from_utf8_lossy(&bytes).to_string();
            let files = extract_file_changes(&output);
            let completed_at = Utc::now();
            let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

            info!(
                success = exit_status.success(),
                duration_seconds, "execution finished"
            );

            let error = if exit_status.success() {
                None
            } else {
                Some(format!("{prompt}: process exited with {:?}", exit_status.code()))
            };

            Ok(ExecutionResult {
                success: exit_status.success(),
                stdout: output,
                stderr: String::new(),
                exit_code: exit_status.code(),
                duration_seconds,
                created_files: files.created,
                modified_files: files.modified,
                deleted_files: files.deleted,
                error,
            })
        });

        Ok(Execution {
            output_len,
            child: child_slot,
            handle,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawn_reports_binary_not_found_for_unknown_cli() {
        let executor = Executor::new(Some("/no/such/binary".into()), "nonexistent-cli", None, None);
        let req = ExecutionRequest {
            prompt: "do something".into(),
            session_name: None,
            continue_session: false,
            work_dir: None,
            extra_env: vec![],
        };
        let result = executor.spawn(req);
        assert!(matches!(result, Err(ExecutorError::BinaryNotFound)));
    }

    #[tokio::test]
    async fn spawn_and_wait_runs_a_real_command() {
        let executor = Executor::new(Some("/bin/echo".into()), "echo", None, None);
        let req = ExecutionRequest {
            prompt: "hello from the executor".into(),
            session_name: None,
            continue_session: false,
            work_dir: None,
            extra_env: vec![],
        };
        let execution = executor.spawn(req).expect("spawn should succeed");
        let result = execution.wait().await.expect("wait should succeed");
        assert!(result.success);
        assert!(result.stdout.contains("hello from the executor"));
    }
}
