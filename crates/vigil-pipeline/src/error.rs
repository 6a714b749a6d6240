use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("executor error: {0}")]
    Executor(#[from] vigil_executor::ExecutorError),
    #[error("memory error: {0}")]
    Memory(#[from] vigil_memory::MemoryError),
    #[error("reporter error: {0}")]
    Reporter(#[from] vigil_reporter::ReporterError),
    #[error("channel error: {0}")]
    Channel(#[from] vigil_channels::ChannelError),
    #[error("state error: {0}")]
    State(#[from] vigil_state::StateError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
