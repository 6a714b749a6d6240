use serde::{Deserialize, Serialize};
use vigil_core::ReplyHandle;

/// A message to be delivered to an external channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub reply_handle: ReplyHandle,
    pub content: String,
    pub format: MessageFormat,
}

impl OutboundMessage {
    pub fn plain(reply_handle: ReplyHandle, content: impl Into<String>) -> Self {
        Self {
            reply_handle,
            content: content.into(),
            format: MessageFormat::PlainText,
        }
    }
}

/// Formatting hint for outbound message content.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    #[default]
    PlainText,
    /// Escaped per the target chat wire protocol's MarkdownV2 character class.
    MarkdownV2,
    Html,
}

/// Runtime connection state of a channel adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Connected,
    Connecting,
    Disconnected,
    Error(String),
}
