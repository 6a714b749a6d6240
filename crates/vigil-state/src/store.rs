use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, warn};
use vigil_core::{
    EngineStatus, FileChange, FileChangeKind, StateSnapshot, TaskId, TaskInfo, TaskStatus,
};

use crate::error::Result;

/// Durable snapshot of the engine's externally-visible progress and open-task
/// queue. Exclusively owns the snapshot file; no other component writes it.
pub struct StateStore {
    path: PathBuf,
    inner: Mutex<StateSnapshot>,
    failure_count: Mutex<u64>,
}

impl StateStore {
    /// Read the snapshot file at `path`, or start from a zero-valued snapshot
    /// if it is missing or unreadable.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let snapshot = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<StateSnapshot>(&bytes) {
                Ok(s) => s,
                Err(e) => {
                    error!(err = %e, path = %path.display(), "snapshot file is corrupt, starting fresh");
                    StateSnapshot::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StateSnapshot::default(),
            Err(e) => {
                error!(err = %e, path = %path.display(), "failed to read snapshot file, starting fresh");
                StateSnapshot::default()
            }
        };

        Self {
            path,
            inner: Mutex::new(snapshot),
            failure_count: Mutex::new(0),
        }
    }

    /// Clone the current in-memory snapshot.
    pub fn current(&self) -> StateSnapshot {
        self.inner.lock().unwrap().clone()
    }

    pub fn update_status(&self, status: EngineStatus) {
        self.inner.lock().unwrap().last_status = status;
    }

    pub fn add_task(&self, task: TaskInfo) {
        self.inner.lock().unwrap().task_queue.push(task);
    }

    /// Mutate the task matching `task_id` via `f`, then drop it from the open
    /// queue if the mutation left it in a terminal state.
    pub fn update_task_status(&self, task_id: &TaskId, f: impl FnOnce(&mut TaskInfo)) {
        let mut guard = self.inner.lock().unwrap();
        if let Some(task) = guard.task_queue.iter_mut().find(|t| &t.task_id == task_id) {
            f(task);
            let terminal = task.status.is_terminal();
            let status = task.status;
            if terminal {
                match status {
                    TaskStatus::Completed => guard.completed_tasks_count += 1,
                    TaskStatus::Failed => guard.failed_tasks_count += 1,
                    _ => {}
                }
                guard.last_task_timestamp = Some(Utc::now());
                guard.task_queue.retain(|t| &t.task_id != task_id);
            }
        } else {
            warn!(task_id = %task_id, "update_task_status called for unknown task");
        }
    }

    pub fn record_error(&self, message: impl Into<String>, ts: DateTime<Utc>) {
        let mut guard = self.inner.lock().unwrap();
        guard.last_error = Some(message.into());
        guard.last_error_timestamp = Some(ts);
        guard.last_status = EngineStatus::Error;
        drop(guard);
        *self.failure_count.lock().unwrap() += 1;
    }

    /// Append a file-change entry to the bounded ring, dropping the oldest
    /// entry once `ring_size` is exceeded.
    pub fn add_file_change(
        &self,
        file_path: impl Into<String>,
        kind: FileChangeKind,
        actor: impl Into<String>,
        ring_size: usize,
    ) {
        let mut guard = self.inner.lock().unwrap();
        guard.modified_files.push(FileChange {
            file_path: file_path.into(),
            change_type: kind,
            actor: actor.into(),
            timestamp: Utc::now(),
        });
        while guard.modified_files.len() > ring_size {
            guard.modified_files.remove(0);
        }
    }

    /// Drop file-change entries older than `max_age`. Called at gateway
    /// startup, not on a timer.
    pub fn prune_old_file_changes(&self, max_age: Duration) {
        let cutoff = Utc::now() - max_age;
        let mut guard = self.inner.lock().unwrap();
        guard.modified_files.retain(|fc| fc.timestamp >= cutoff);
    }

    /// Atomically serialize current state to disk: write to a temp file in
    /// the same directory as the target, then rename. Readers always see
    /// either the previous complete snapshot or the new one, never a torn
    /// write.
    pub fn snapshot(&self) -> Result<()> {
        let snapshot = self.inner.lock().unwrap().clone();
        let bytes = serde_json::to_vec_pretty(&snapshot)?;

        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".vigil-state-")
            .suffix(".tmp")
            .tempfile_in(&dir)?;
        use std::io::Write;
        tmp.write_all(&bytes)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| crate::error::StateError::Io(e.error))?;

        Ok(())
    }

    /// Number of failed snapshot/write attempts recorded via `record_error`.
    /// Disk I/O errors are reported but not fatal; the next cycle retries.
    pub fn failure_count(&self) -> u64 {
        *self.failure_count.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vigil_core::{ChannelKind, ReplyHandle, SenderId};

    fn sample_task(id: &str) -> TaskInfo {
        TaskInfo {
            task_id: TaskId::new(id),
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
            output_files: Default::default(),
            error: None,
            report_url: None,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn snapshot_round_trips_across_simulated_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        {
            let store = StateStore::load(&path);
            store.update_status(EngineStatus::Running);
            store.add_task(sample_task("t1"));
            store.snapshot().unwrap();
        }

        // simulate restart: a fresh StateStore reads the file back
        let restarted = StateStore::load(&path);
        let snap = restarted.current();
        assert_eq!(snap.last_status, EngineStatus::Running);
        assert_eq!(snap.task_queue.len(), 1);
        assert_eq!(snap.task_queue[0].task_id.as_str(), "t1");
    }

    #[test]
    fn terminal_task_leaves_open_queue() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path().join("state.json"));
        store.add_task(sample_task("t1"));
        store.update_task_status(&TaskId::new("t1"), |t| {
            t.transition(TaskStatus::Processing);
            t.transition(TaskStatus::Completed);
        });
        let snap = store.current();
        assert!(snap.task_queue.is_empty());
        assert_eq!(snap.completed_tasks_count, 1);
    }

    #[test]
    fn file_change_ring_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::load(dir.path().join("state.json"));
        for i in 0..10 {
            store.add_file_change(format!("file_{i}.rs"), FileChangeKind::Created, "executor", 5);
        }
        let snap = store.current();
        assert_eq!(snap.modified_files.len(), 5);
        assert_eq!(snap.modified_files[0].file_path, "file_5.rs");
    }
}
