use async_trait::async_trait;
use vigil_core::{ChannelKind, Message};

use crate::{error::ChannelError, types::OutboundMessage, types::ChannelStatus};

/// Common interface implemented by every channel adapter (chat, mail, …).
///
/// Receiving is non-destructive until [`Channel::mark_processed`] is called
/// for a given message id; once marked, subsequent `receive` calls must not
/// return that id again.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Stable lowercase identifier for this channel instance.
    fn name(&self) -> &str;

    fn channel_type(&self) -> ChannelKind;

    async fn connect(&mut self) -> Result<(), ChannelError>;

    async fn disconnect(&mut self) -> Result<(), ChannelError>;

    /// Poll for up to `limit` new messages. Network failures are never fatal —
    /// implementations should log and return an empty vec rather than
    /// propagate on transient errors.
    async fn receive(&mut self, limit: usize) -> Result<Vec<Message>, ChannelError>;

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError>;

    /// Mark a message id as processed so it is not returned by future
    /// `receive` calls.
    async fn mark_processed(&mut self, id: &str) -> Result<bool, ChannelError>;

    fn status(&self) -> ChannelStatus;
}
