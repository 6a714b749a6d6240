pub mod error;
pub mod notify;
pub mod pipeline;
pub mod router;
pub mod skills;

pub use error::{PipelineError, Result};
pub use notify::ChannelNotifier;
pub use pipeline::{Pipeline, PipelineDeps};
