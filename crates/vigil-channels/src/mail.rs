use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use lettre::message::Message as SmtpMessage;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use tracing::{info, warn};
use vigil_core::{ChannelKind, Message, SenderId};

use crate::channel::Channel;
use crate::error::ChannelError;
use crate::types::{ChannelStatus, OutboundMessage};

/// Connects over IMAPS for inbound and SMTP+STARTTLS for outbound. No teacher
/// crate covers mail; behavior (subject-prefix filter, plain-text-preferred
/// body extraction, consecutive-failure backoff counter) is grounded on the
/// original listener/reporter pair for the mail transport.
pub struct MailAdapter {
    imap_host: String,
    imap_port: u16,
    smtp_host: String,
    smtp_port: u16,
    username: String,
    password: String,
    subject_prefix: String,
    status: ChannelStatus,
    consecutive_failures: Arc<AtomicU32>,
    seen_uids: HashSet<String>,
}

impl MailAdapter {
    pub fn new(
        imap_host: String,
        imap_port: u16,
        smtp_host: String,
        smtp_port: u16,
        username: String,
        password: String,
        subject_prefix: String,
    ) -> Self {
        Self {
            imap_host,
            imap_port,
            smtp_host,
            smtp_port,
            username,
            password,
            subject_prefix,
            status: ChannelStatus::Disconnected,
            consecutive_failures: Arc::new(AtomicU32::new(0)),
            seen_uids: HashSet::new(),
        }
    }

    /// Extract a plain-text body preferentially, falling back to HTML stripped
    /// of markup.
    fn extract_body(raw: &[u8]) -> String {
        let parsed = match mailparse::parse_mail(raw) {
            Ok(p) => p,
            Err(_) => return String::from_utf8_lossy(raw).to_string(),
        };

        if let Some(body) = find_part(&parsed, "text/plain") {
            return body;
        }
        if let Some(html) = find_part(&parsed, "text/html") {
            return html2text::from_read(html.as_bytes(), 120);
        }
        parsed.get_body().unwrap_or_default()
    }
}

fn find_part(mail: &mailparse::ParsedMail, mimetype: &str) -> Option<String> {
    if mail.ctype.mimetype == mimetype {
        return mail.get_body().ok();
    }
    for sub in &mail.subparts {
        if let Some(found) = find_part(sub, mimetype) {
            return Some(found);
        }
    }
    None
}

#[async_trait]
impl Channel for MailAdapter {
    fn name(&self) -> &str {
        "mail"
    }

    fn channel_type(&self) -> ChannelKind {
        ChannelKind::Mail
    }

    async fn connect(&mut self) -> Result<(), ChannelError> {
        self.status = ChannelStatus::Connecting;
        let username = self.username.clone();
        let password = self.password.clone();
        let host = self.imap_host.clone();
        let port = self.imap_port;

        let result = tokio::task::spawn_blocking(move || {
            let tls = native_tls::TlsConnector::builder()
                .build()
                .map_err(|e| e.to_string())?;
            let client =
                imap::connect((host.as_str(), port), &host, &tls).map_err(|e| e.to_string())?;
            let mut session = client
                .login(&username, &password)
                .map_err(|(e, _)| e.to_string())?;
            session.logout().map_err(|e| e.to_string())?;
            Ok::<(), String>(())
        })
        .await
        .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        match result {
            Ok(()) => {
                self.status = ChannelStatus::Connected;
                self.consecutive_failures.store(0, Ordering::Relaxed);
                info!("mail adapter connected");
                Ok(())
            }
            Err(e) => {
                self.status = ChannelStatus::Error(e.clone());
                Err(ChannelError::ConnectionFailed(e))
            }
        }
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        self.status = ChannelStatus::Disconnected;
        Ok(())
    }

    async fn receive(&mut self, limit: usize) -> Result<Vec<Message>, ChannelError> {
        let username = self.username.clone();
        let password = self.password.clone();
        let host = self.imap_host.clone();
        let port = self.imap_port;
        let prefix = self.subject_prefix.clone();
        let failures = self.consecutive_failures.clone();

        let outcome = tokio::task::spawn_blocking(move || -> std::result::Result<Vec<(String, String, Vec<u8>)>, String> {
            let tls = native_tls::TlsConnector::builder().build().map_err(|e| e.to_string())?;
            let client = imap::connect((host.as_str(), port), &host, &tls).map_err(|e| e.to_string())?;
            let mut session = client.login(&username, &password).map_err(|(e, _)| e.to_string())?;
            session.select("INBOX").map_err(|e| e.to_string())?;

            let uids = session.search("UNSEEN").map_err(|e| e.to_string())?;
            let mut out = Vec::new();
            for uid in uids.into_iter().take(limit) {
                let fetched = session.fetch(uid.to_string(), "RFC822").map_err(|e| e.to_string())?;
                for msg in fetched.iter() {
                    if let Some(body) = msg.body() {
                        if let Ok(parsed) = mailparse::parse_mail(body) {
                            let subject = parsed
                                .headers
                                .iter()
                                .find(|h| h.get_key().eq_ignore_ascii_case("subject"))
                                .map(|h| h.get_value())
                                .unwrap_or_default();
                            if subject.starts_with(&prefix) {
                                out.push((uid.to_string(), subject, body.to_vec()));
                            }
                        }
                    }
                }
            }
            session.logout().ok();
            Ok(out)
        })
        .await
        .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        match outcome {
            Ok(entries) => {
                failures.store(0, Ordering::Relaxed);
                let mut messages = Vec::new();
                for (uid, subject, raw) in entries {
                    if self.seen_uids.contains(&uid) {
                        continue;
                    }
                    let body = Self::extract_body(&raw);
                    messages.push(Message {
                        id: uid,
                        channel: ChannelKind::Mail,
                        sender: SenderId::from(self.username.as_str()),
                        recipient: Some(self.username.clone()),
                        subject: Some(subject),
                        content: body.clone(),
                        raw_content: body,
                        timestamp: Utc::now(),
                        metadata: Default::default(),
                    });
                }
                Ok(messages)
            }
            Err(e) => {
                let n = failures.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(error = %e, consecutive_failures = n, "mail receive failed, will retry next poll");
                Ok(Vec::new())
            }
        }
    }

    async fn send(&self, msg: &OutboundMessage) -> Result<(), ChannelError> {
        let to = msg.reply_handle.as_str().to_string();
        let from = self.username.clone();
        let password = self.password.clone();
        let host = self.smtp_host.clone();
        let port = self.smtp_port;
        let body = msg.content.clone();

        tokio::task::spawn_blocking(move || -> std::result::Result<(), String> {
            let email = SmtpMessage::builder()
                .from(from.parse().map_err(|e: lettre::address::AddressError| e.to_string())?)
                .to(to.parse().map_err(|e: lettre::address::AddressError| e.to_string())?)
                .subject("Re: Task")
                .body(body)
                .map_err(|e| e.to_string())?;

            let creds = Credentials::new(from.clone(), password);
            let transport = SmtpTransport::starttls_relay(&host)
                .map_err(|e| e.to_string())?
                .port(port)
                .credentials(creds)
                .build();

            transport.send(&email).map_err(|e| e.to_string())?;
            Ok(())
        })
        .await
        .map_err(|e| ChannelError::SendFailed(e.to_string()))?
        .map_err(ChannelError::SendFailed)
    }

    async fn mark_processed(&mut self, id: &str) -> Result<bool, ChannelError> {
        if !self.seen_uids.insert(id.to_string()) {
            return Ok(false);
        }

        let username = self.username.clone();
        let password = self.password.clone();
        let host = self.imap_host.clone();
        let port = self.imap_port;
        let uid = id.to_string();

        let result = tokio::task::spawn_blocking(move || -> std::result::Result<(), String> {
            let tls = native_tls::TlsConnector::builder().build().map_err(|e| e.to_string())?;
            let client = imap::connect((host.as_str(), port), &host, &tls).map_err(|e| e.to_string())?;
            let mut session = client.login(&username, &password).map_err(|(e, _)| e.to_string())?;
            session.select("INBOX").map_err(|e| e.to_string())?;
            session
                .store(&uid, "+FLAGS (\\Seen)")
                .map_err(|e| e.to_string())?;
            session.logout().ok();
            Ok(())
        })
        .await
        .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        result.map(|_| true).map_err(ChannelError::SendFailed)
    }

    fn status(&self) -> ChannelStatus {
        self.status.clone()
    }
}
