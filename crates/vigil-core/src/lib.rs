pub mod config;
pub mod error;
pub mod types;

pub use config::VigilConfig;
pub use error::{Result, VigilError};
pub use types::*;
