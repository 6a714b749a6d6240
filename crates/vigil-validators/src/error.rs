use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("invalid regex pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
