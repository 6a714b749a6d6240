use std::collections::HashMap;

use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};
use vigil_core::Message;

use crate::{channel::Channel, error::ChannelError, types::ChannelStatus};

const BACKOFF_BASE_SECS: u64 = 5;
const BACKOFF_MAX_SECS: u64 = 300;
const MAX_ATTEMPTS: u32 = 10;
const JITTER_FRACTION: f64 = 0.10;

/// Manages the set of registered channel adapters: connect/disconnect as a
/// group, poll all of them, and route outbound sends by channel name.
pub struct ChannelManager {
    channels: HashMap<String, Box<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    pub fn register(&mut self, channel: Box<dyn Channel>) {
        let name = channel.name().to_string();
        info!(channel = %name, "registering channel adapter");
        self.channels.insert(name, channel);
    }

    /// Connect all registered channels, applying exponential backoff with
    /// jitter per channel on failure.
    pub async fn connect_all(&mut self) {
        for (name, channel) in self.channels.iter_mut() {
            info!(channel = %name, "connecting channel");
            if let Err(e) = connect_with_backoff(name, channel.as_mut()).await {
                error!(channel = %name, error = %e, "failed to connect channel after retries");
            }
        }
    }

    pub async fn disconnect_all(&mut self) {
        for (name, channel) in self.channels.iter_mut() {
            info!(channel = %name, "disconnecting channel");
            if let Err(e) = channel.disconnect().await {
                warn!(channel = %name, error = %e, "error while disconnecting channel");
            }
        }
    }

    /// Poll every connected channel once; errors from one channel do not
    /// prevent polling the rest.
    pub async fn receive_all(&mut self, limit: usize) -> Vec<(String, Message)> {
        let mut out = Vec::new();
        for (name, channel) in self.channels.iter_mut() {
            match channel.receive(limit).await {
                Ok(messages) => {
                    for m in messages {
                        out.push((name.clone(), m));
                    }
                }
                Err(e) => {
                    warn!(channel = %name, error = %e, "receive failed, will retry next poll");
                }
            }
        }
        out
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Channel + '_)> {
        match self.channels.get_mut(name) {
            Some(b) => Some(b.as_mut()),
            None => None,
        }
    }

    pub fn get(&self, name: &str) -> Option<&(dyn Channel + '_)> {
        match self.channels.get(name) {
            Some(b) => Some(b.as_ref()),
            None => None,
        }
    }

    pub fn statuses(&self) -> Vec<(String, ChannelStatus)> {
        let mut result: Vec<(String, ChannelStatus)> = self
            .channels
            .iter()
            .map(|(name, ch)| (name.clone(), ch.status()))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Attempt to connect a single channel with exponential backoff and ±10% jitter.
/// Schedule: 5s → 10s → 20s → … → 300s (cap), up to `MAX_ATTEMPTS` tries.
async fn connect_with_backoff(name: &str, channel: &mut dyn Channel) -> Result<(), ChannelError> {
    let mut delay_secs = BACKOFF_BASE_SECS;

    for attempt in 1..=MAX_ATTEMPTS {
        match channel.connect().await {
            Ok(()) => {
                info!(channel = %name, attempt, "channel connected successfully");
                return Ok(());
            }
            Err(e) if attempt == MAX_ATTEMPTS => {
                return Err(e);
            }
            Err(e) => {
                let jitter = jitter_secs(delay_secs);
                let total = delay_secs + jitter;
                warn!(
                    channel = %name,
                    attempt,
                    max = MAX_ATTEMPTS,
                    error = %e,
                    retry_after_secs = total,
                    "channel connect failed, retrying with backoff"
                );
                sleep(Duration::from_secs(total)).await;
                delay_secs = (delay_secs * 2).min(BACKOFF_MAX_SECS);
            }
        }
    }

    unreachable!("backoff loop exited without returning")
}

/// Deterministic jitter derived from the current timestamp, avoiding a rand
/// dependency for a cosmetic spread.
fn jitter_secs(base_secs: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);

    let max_jitter = ((base_secs as f64) * JITTER_FRACTION) as u64;
    if max_jitter == 0 {
        return 0;
    }
    (nanos as u64) % max_jitter
}
