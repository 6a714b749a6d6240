use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefinerError {
    #[error("LLM provider error: {0}")]
    Llm(#[from] vigil_llm::ProviderError),
}

pub type Result<T> = std::result::Result<T, RefinerError>;
