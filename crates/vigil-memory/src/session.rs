use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, instrument};
use vigil_core::{ChannelKind, SenderId, Session, SessionId, SessionMessage, SessionStatus};

use crate::error::MemoryError;

/// Thread-safe manager for persisted conversational sessions.
///
/// Wraps a single SQLite connection in a `Mutex` — sufficient for the
/// cooperative single-pipeline target; a pool is not needed here.
pub struct SessionManager {
    db: Mutex<Connection>,
}

impl SessionManager {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    /// Return the existing session for `(user_id, platform)` or create one.
    #[instrument(skip(self))]
    pub fn get_or_create(&self, user_id: &SenderId, platform: ChannelKind) -> Result<Session, MemoryError> {
        if let Some(session) = self.find(user_id, platform)? {
            debug!("session cache hit");
            return Ok(session);
        }

        let session = Session {
            session_id: SessionId::new(),
            user_id: user_id.clone(),
            platform,
            status: SessionStatus::Active,
            messages: Vec::new(),
            context_vars: HashMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        self.persist(&session)?;
        Ok(session)
    }

    fn find(&self, user_id: &SenderId, platform: ChannelKind) -> Result<Option<Session>, MemoryError> {
        let db = self.db.lock().unwrap();
        let platform_str = channel_kind_str(platform);
        let result = db.query_row(
            "SELECT session_id, user_id, platform, status, messages, context_vars,
                    created_at, updated_at
             FROM sessions WHERE user_id = ?1 AND platform = ?2
             ORDER BY updated_at DESC LIMIT 1",
            rusqlite::params![user_id.as_str(), platform_str],
            row_to_session,
        );
        match result {
            Ok(s) => Ok(Some(s?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MemoryError::Database(e)),
        }
    }

    #[instrument(skip(self, session))]
    pub fn persist(&self, session: &Session) -> Result<(), MemoryError> {
        let db = self.db.lock().unwrap();
        let messages_json = serde_json::to_string(&session.messages)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;
        let context_json = serde_json::to_string(&session.context_vars)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;
        db.execute(
            "INSERT INTO sessions (session_id, user_id, platform, status, messages,
                context_vars, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(session_id) DO UPDATE SET
                status = excluded.status,
                messages = excluded.messages,
                context_vars = excluded.context_vars,
                updated_at = excluded.updated_at",
            rusqlite::params![
                session.session_id.as_str(),
                session.user_id.as_str(),
                channel_kind_str(session.platform),
                session_status_str(session.status),
                messages_json,
                context_json,
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Append a message and persist, enforcing the bounded-retention rule.
    pub fn push_message(
        &self,
        session: &mut Session,
        msg: SessionMessage,
        max_messages: usize,
    ) -> Result<(), MemoryError> {
        session.push_message(msg, max_messages);
        self.persist(session)
    }
}

fn channel_kind_str(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Mail => "mail",
        ChannelKind::Chat => "chat",
    }
}

fn session_status_str(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Active => "active",
        SessionStatus::Idle => "idle",
        SessionStatus::Archived => "archived",
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Session, MemoryError>> {
    let session_id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let platform_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let messages_json: String = row.get(4)?;
    let context_json: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;

    let parsed = (|| -> Result<Session, MemoryError> {
        Ok(Session {
            session_id: SessionId::from(session_id.as_str()),
            user_id: SenderId::from(user_id.as_str()),
            platform: match platform_str.as_str() {
                "mail" => ChannelKind::Mail,
                _ => ChannelKind::Chat,
            },
            status: match status_str.as_str() {
                "idle" => SessionStatus::Idle,
                "archived" => SessionStatus::Archived,
                _ => SessionStatus::Active,
            },
            messages: serde_json::from_str(&messages_json)
                .map_err(|e| MemoryError::Serialization(e.to_string()))?,
            context_vars: serde_json::from_str(&context_json)
                .map_err(|e| MemoryError::Serialization(e.to_string()))?,
            created_at: created_at
                .parse()
                .map_err(|_| MemoryError::Serialization("bad created_at".into()))?,
            updated_at: updated_at
                .parse()
                .map_err(|_| MemoryError::Serialization("bad updated_at".into()))?,
        })
    })();

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use vigil_core::Role;

    fn manager() -> SessionManager {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        SessionManager::new(conn)
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mgr = manager();
        let user = SenderId::from("user-1");
        let first = mgr.get_or_create(&user, ChannelKind::Chat).unwrap();
        let second = mgr.get_or_create(&user, ChannelKind::Chat).unwrap();
        assert_eq!(first.session_id.as_str(), second.session_id.as_str());
    }

    #[test]
    fn push_message_persists_across_reload() {
        let mgr = manager();
        let user = SenderId::from("user-2");
        let mut session = mgr.get_or_create(&user, ChannelKind::Chat).unwrap();
        mgr.push_message(
            &mut session,
            SessionMessage {
                role: Role::User,
                content: "hello".into(),
                timestamp: Utc::now(),
            },
            20,
        )
        .unwrap();

        let reloaded = mgr.find(&user, ChannelKind::Chat).unwrap().unwrap();
        assert_eq!(reloaded.messages.len(), 1);
        assert_eq!(reloaded.messages[0].content, "hello");
    }
}
