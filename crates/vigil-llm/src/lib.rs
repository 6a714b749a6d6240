pub mod http;
pub mod provider;

pub use http::HttpLlmProvider;
pub use provider::{ChatMessage, ChatRequest, ChatResponse, LlmProvider, ProviderError};
