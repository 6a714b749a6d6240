pub mod artifact;
pub mod error;
pub mod reply;

pub use artifact::ArtifactGenerator;
pub use error::ReporterError;
pub use reply::{chat_max_chars, format_reply, Outcome};
