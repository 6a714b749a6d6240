use thiserror::Error;

#[derive(Debug, Error)]
pub enum VigilError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("state store error: {0}")]
    State(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("channel error ({channel}): {reason}")]
    Channel { channel: String, reason: String },

    #[error("LLM provider error: {0}")]
    LlmProvider(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request timeout after {ms}ms")]
    Timeout { ms: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl VigilError {
    /// Short error code, used in log fields and error records.
    pub fn code(&self) -> &'static str {
        match self {
            VigilError::Config(_) => "CONFIG_ERROR",
            VigilError::State(_) => "STATE_ERROR",
            VigilError::Database(_) => "DATABASE_ERROR",
            VigilError::Channel { .. } => "CHANNEL_ERROR",
            VigilError::LlmProvider(_) => "LLM_PROVIDER_ERROR",
            VigilError::Executor(_) => "EXECUTOR_ERROR",
            VigilError::Serialization(_) => "SERIALIZATION_ERROR",
            VigilError::Io(_) => "IO_ERROR",
            VigilError::Timeout { .. } => "TIMEOUT",
            VigilError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, VigilError>;
