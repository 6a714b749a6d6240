pub mod error;
pub mod executor;
pub mod file_changes;
pub mod resolve;

pub use error::ExecutorError;
pub use executor::{Execution, ExecutionHandle, ExecutionRequest, Executor};
pub use file_changes::{extract_file_changes, extract_file_paths};
pub use resolve::{resolve_binary, shell_quote};
