use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("code-generation CLI binary not found")]
    BinaryNotFound,
    #[error("failed to spawn subprocess: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
