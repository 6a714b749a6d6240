use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("executor error: {0}")]
    Executor(#[from] vigil_executor::ExecutorError),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
