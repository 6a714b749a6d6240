pub mod chat;
pub mod channel;
pub mod error;
pub mod escape;
pub mod mail;
pub mod manager;
pub mod types;

pub use chat::ChatAdapter;
pub use channel::Channel;
pub use error::ChannelError;
pub use mail::MailAdapter;
pub use manager::ChannelManager;
pub use types::{ChannelStatus, MessageFormat, OutboundMessage};
