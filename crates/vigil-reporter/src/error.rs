use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReporterError>;
