pub mod composite;
pub mod error;
pub mod file_exists;
pub mod json_validator;
pub mod keyword_validator;
pub mod regex_validator;
pub mod validator;

pub use composite::{CompositeMode, CompositeValidator};
pub use error::ValidatorError;
pub use file_exists::FileExistsValidator;
pub use json_validator::JsonValidator;
pub use keyword_validator::KeywordValidator;
pub use regex_validator::RegexValidator;
pub use validator::Validator;
