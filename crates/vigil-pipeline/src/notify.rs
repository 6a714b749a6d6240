use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tracing::warn;
use vigil_channels::{ChannelManager, OutboundMessage};
use vigil_core::ReplyHandle;
use vigil_supervisor::Notifier;

/// Routes Health Monitor alerts to the task's originating channel as
/// plain-text replies. A send failure is logged, never propagated — the
/// monitor's cancellation decision must not depend on delivery succeeding.
pub struct ChannelNotifier<'a> {
    pub channels: &'a AsyncMutex<ChannelManager>,
    pub channel_name: String,
    pub reply_handle: ReplyHandle,
}

#[async_trait]
impl<'a> Notifier for ChannelNotifier<'a> {
    async fn notify(&self, message: &str) {
        let channels = self.channels.lock().await;
        let Some(channel) = channels.get(&self.channel_name) else {
            warn!(channel = %self.channel_name, "notifier target channel is not registered");
            return;
        };
        let outbound = OutboundMessage::plain(self.reply_handle.clone(), message);
        if let Err(e) = channel.send(&outbound).await {
            warn!(channel = %self.channel_name, error = %e, "failed to deliver health monitor notification");
        }
    }
}
