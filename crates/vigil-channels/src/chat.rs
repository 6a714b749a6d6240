use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, warn};
use vigil_core::{ChannelKind, Message, SenderId};

use crate::channel::Channel;
use crate::error::ChannelError;
use crate::escape::{escape_markdown_v2, split_chunks};
use crate::types::{ChannelStatus, MessageFormat, OutboundMessage};

const CHUNK_MAX: usize = 4090;
const COMMAND_PREFIX: char = '/';

/// Manual long-poll adapter for a generic chat bot API (three endpoints:
/// identity, updates-since-offset, send). Built directly against `reqwest`
/// rather than a dispatcher abstraction, for explicit `offset`/`update_id`
/// control over the poll cursor.
pub struct ChatAdapter {
    client: reqwest::Client,
    base_url: String,
    bot_token: String,
    poll_timeout_secs: u64,
    allow_list: HashSet<String>,
    offset: i64,
    processed_ids: HashSet<String>,
    status: ChannelStatus,
}

impl ChatAdapter {
    pub fn new(
        base_url: String,
        bot_token: String,
        poll_timeout_secs: u64,
        allow_list: Vec<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            bot_token,
            poll_timeout_secs,
            allow_list: allow_list.into_iter().collect(),
            offset: 0,
            processed_ids: HashSet::new(),
            status: ChannelStatus::Disconnected,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}{}/{}", self.base_url, self.bot_token, method)
    }

    fn is_allowed(&self, sender: &str) -> bool {
        self.allow_list.is_empty() || self.allow_list.contains(sender)
    }
}

#[async_trait]
impl Channel for ChatAdapter {
    fn name(&self) -> &str {
        "chat"
    }

    fn channel_type(&self) -> ChannelKind {
        ChannelKind::Chat
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        self.status = ChannelStatus::Connecting;
        let url = self.api_url("getMe");
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            self.status = ChannelStatus::Error(format!("getMe returned {status}"));
            return Err(ChannelError::AuthFailed(format!("getMe returned {status}")));
        }

        self.status = ChannelStatus::Connected;
        info!("chat adapter connected");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        self.status = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn receive(&mut self, limit: usize) -> Result<Vec<Message>, ChannelError> {
        let url = self.api_url("getUpdates");
        let resp = match self
            .client
            .get(&url)
            .query(&[
                ("offset", self.offset.to_string()),
                ("timeout", self.poll_timeout_secs.to_string()),
                ("limit", limit.to_string()),
            ])
            .timeout(Duration::from_secs(self.poll_timeout_secs + 10))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                // transient network failure — never fatal, surface as empty
                warn!(error = %e, "chat getUpdates failed");
                return Ok(Vec::new());
            }
        };

        if !resp.status().is_success() {
            warn!(status = %resp.status(), "chat getUpdates non-success status");
            return Ok(Vec::new());
        }

        let body: GetUpdatesResponse = match resp.json().await {
            Ok(b) => b,
            Err(e) => {
                warn!(error = %e, "chat getUpdates body parse failed");
                return Ok(Vec::new());
            }
        };

        let mut out = Vec::new();
        for update in body.result {
            self.offset = self.offset.max(update.update_id + 1);

            let Some(msg) = update.message else { continue };
            let Some(text) = msg.text else { continue };

            if text.starts_with(COMMAND_PREFIX) {
                debug!(text = %text, "dropping command-prefixed message");
                continue;
            }

            let sender = msg.chat.id.to_string();
            if !self.is_allowed(&sender) {
                debug!(sender = %sender, "dropping message from non-allow-listed sender");
                continue;
            }

            let id = update.update_id.to_string();
            if self.processed_ids.contains(&id) {
                continue;
            }

            out.push(Message {
                id,
                channel: ChannelKind::Chat,
                sender: SenderId::from(sender.as_str()),
                recipient: None,
                subject: None,
                content: text.clone(),
                raw_content: text,
                timestamp: Utc::now(),
                metadata: Default::default(),
            });
        }

        Ok(out)
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let url = self.api_url("sendMessage");
        let chat_id = msg.reply_handle.as_str();

        for chunk in split_chunks(&msg.content, CHUNK_MAX) {
            let (text, parse_mode) = match msg.format {
                MessageFormat::MarkdownV2 => (escape_markdown_v2(&chunk), Some("MarkdownV2")),
                MessageFormat::Html => (chunk.clone(), Some("HTML")),
                MessageFormat::PlainText => (chunk.clone(), None),
            };

            let mut body = serde_json::json!({
                "chat_id": chat_id,
                "text": text,
            });
            if let Some(mode) = parse_mode {
                body["parse_mode"] = serde_json::json!(mode);
            }

            let resp = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

            if !resp.status().is_success() {
                // fall back to plain text if formatting caused the rejection
                if parse_mode.is_some() {
                    let fallback = serde_json::json!({ "chat_id": chat_id, "text": chunk });
                    let retry = self
                        .client
                        .post(&url)
                        .json(&fallback)
                        .send()
                        .await
                        .map_err(|e| ChannelError::SendFailed(e.to_string()))?;
                    if !retry.status().is_success() {
                        return Err(ChannelError::SendFailed(format!(
                            "sendMessage returned {}",
                            retry.status()
                        )));
                    }
                } else {
                    return Err(ChannelError::SendFailed(format!(
                        "sendMessage returned {}",
                        resp.status()
                    )));
                }
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        Ok(())
    }

    async fn mark_processed(&mut self, id: &str) -> Result<bool, ChannelError> {
        Ok(self.processed_ids.insert(id.to_string()))
    }

    fn status(&self) -> ChannelStatus {
        self.status.clone()
    }
}

#[derive(Deserialize)]
struct GetUpdatesResponse {
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<IncomingMessage>,
}

#[derive(Deserialize)]
struct IncomingMessage {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_empty_permits_everyone() {
        let adapter = ChatAdapter::new("http://x/".into(), "tok".into(), 30, vec![]);
        assert!(adapter.is_allowed("anyone"));
    }

    #[test]
    fn allow_list_restricts_to_members() {
        let adapter = ChatAdapter::new("http://x/".into(), "tok".into(), 30, vec!["42".into()]);
        assert!(adapter.is_allowed("42"));
        assert!(!adapter.is_allowed("99"));
    }
}
