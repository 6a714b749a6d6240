use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, instrument};
use vigil_core::{FileChange, InteractionHistoryRecord, SenderId, SessionId, TaskStatus, UserPreference};

use crate::error::MemoryError;
use crate::types::{cosine_similarity, keyword_overlap, EmbeddingProvider, MemoryEntry, NoEmbeddingProvider, RelevanceHit};

/// Thread-safe manager for per-user preferences, interaction history, and
/// the richer embeddable memory entry type.
pub struct MemoryManager {
    db: Mutex<Connection>,
    embeddings: Box<dyn EmbeddingProvider>,
}

impl MemoryManager {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
            embeddings: Box::new(NoEmbeddingProvider),
        }
    }

    pub fn with_embedding_provider(conn: Connection, provider: Box<dyn EmbeddingProvider>) -> Self {
        Self {
            db: Mutex::new(conn),
            embeddings: provider,
        }
    }

    #[instrument(skip(self, pref))]
    pub fn save_preference(&self, pref: &UserPreference) -> Result<(), MemoryError> {
        let db = self.db.lock().unwrap();
        let custom = serde_json::to_string(&pref.custom_settings)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;
        db.execute(
            "INSERT INTO preferences (user_id, preferred_language, code_style,
                communication_style, timezone, custom_settings)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id) DO UPDATE SET
                preferred_language = excluded.preferred_language,
                code_style = excluded.code_style,
                communication_style = excluded.communication_style,
                timezone = excluded.timezone,
                custom_settings = excluded.custom_settings",
            rusqlite::params![
                pref.user_id.as_str(),
                pref.preferred_language,
                pref.code_style,
                pref.communication_style,
                pref.timezone,
                custom,
            ],
        )?;
        Ok(())
    }

    pub fn load_preference(&self, user_id: &SenderId) -> Result<Option<UserPreference>, MemoryError> {
        let db = self.db.lock().unwrap();
        let result = db.query_row(
            "SELECT user_id, preferred_language, code_style, communication_style,
                    timezone, custom_settings
             FROM preferences WHERE user_id = ?1",
            rusqlite::params![user_id.as_str()],
            row_to_preference,
        );
        match result {
            Ok(p) => Ok(Some(p?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MemoryError::Database(e)),
        }
    }

    #[instrument(skip(self, record))]
    pub fn append_interaction_history(&self, record: &InteractionHistoryRecord) -> Result<(), MemoryError> {
        let db = self.db.lock().unwrap();
        let file_changes = serde_json::to_string(&record.file_changes)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;
        db.execute(
            "INSERT INTO interaction_history
             (session_id, user_id, task_summary, outcome, file_changes,
              duration_seconds, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                record.session_id.as_str(),
                record.user_id.as_str(),
                record.task_summary,
                task_status_str(record.outcome),
                file_changes,
                record.duration_seconds,
                record.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn recent_interaction_history(
        &self,
        user_id: &SenderId,
        limit: usize,
    ) -> Result<Vec<InteractionHistoryRecord>, MemoryError> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT session_id, user_id, task_summary, outcome, file_changes,
                    duration_seconds, timestamp
             FROM interaction_history
             WHERE user_id = ?1
             ORDER BY timestamp DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![user_id.as_str(), limit as i64], row_to_history)?;
        rows.filter_map(|r| r.ok()).collect::<Result<Vec<_>, _>>()
    }

    /// Upsert a memory entry. Existing rows keep the higher importance score.
    #[instrument(skip(self))]
    pub fn learn(&self, user_id: &str, key: &str, value: &str, importance: f32, ttl_days: i64) -> Result<(), MemoryError> {
        let db = self.db.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        let embedding = self
            .embeddings
            .embed(value)
            .map(|v| serde_json::to_string(&v).unwrap_or_default());

        db.execute(
            "INSERT INTO memory_entries (user_id, key, value, embedding, importance,
                access_count, ttl_days, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?7)
             ON CONFLICT(user_id, key) DO UPDATE SET
                value = excluded.value,
                embedding = excluded.embedding,
                importance = MAX(memory_entries.importance, excluded.importance),
                updated_at = excluded.updated_at",
            rusqlite::params![user_id, key, value, embedding, importance, ttl_days, now],
        )?;
        Ok(())
    }

    /// Top-K memory entries for `user_id` relevant to `query`, above
    /// `min_relevance`. Ranks by cosine similarity when an embedding is
    /// available, otherwise by keyword overlap.
    #[instrument(skip(self, query))]
    pub fn search_relevant(
        &self,
        user_id: &str,
        query: &str,
        top_k: usize,
        min_relevance: f32,
    ) -> Result<Vec<RelevanceHit>, MemoryError> {
        let now = Utc::now();
        let entries = self.load_entries(user_id)?;
        let query_embedding = self.embeddings.embed(query);

        let mut hits: Vec<RelevanceHit> = entries
            .into_iter()
            .filter(|e| !e.is_expired(now))
            .filter_map(|entry| {
                let relevance = match (&query_embedding, &entry.embedding) {
                    (Some(q), Some(e)) => cosine_similarity(q, e),
                    _ => keyword_overlap(query, &entry.value),
                };
                if relevance >= min_relevance {
                    Some(RelevanceHit { entry, relevance })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| b.relevance.partial_cmp(&a.relevance).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);

        for hit in &hits {
            self.bump_access_count(hit.entry.id)?;
        }
        Ok(hits)
    }

    /// Delete memory entries whose TTL has elapsed.
    pub fn purge_expired(&self) -> Result<usize, MemoryError> {
        let entries = self.load_entries_all()?;
        let now = Utc::now();
        let expired: Vec<i64> = entries.iter().filter(|e| e.is_expired(now)).map(|e| e.id).collect();
        if expired.is_empty() {
            return Ok(0);
        }
        let db = self.db.lock().unwrap();
        for id in &expired {
            db.execute("DELETE FROM memory_entries WHERE id = ?1", rusqlite::params![id])?;
        }
        debug!(count = expired.len(), "purged expired memory entries");
        Ok(expired.len())
    }

    fn bump_access_count(&self, id: i64) -> Result<(), MemoryError> {
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE memory_entries SET access_count = access_count + 1 WHERE id = ?1",
            rusqlite::params![id],
        )?;
        Ok(())
    }

    fn load_entries(&self, user_id: &str) -> Result<Vec<MemoryEntry>, MemoryError> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_id, key, value, embedding, importance, access_count,
                    ttl_days, created_at, updated_at
             FROM memory_entries WHERE user_id = ?1",
        )?;
        let rows = stmt.query_map(rusqlite::params![user_id], row_to_entry)?;
        rows.filter_map(|r| r.ok()).collect::<Result<Vec<_>, _>>()
    }

    fn load_entries_all(&self) -> Result<Vec<MemoryEntry>, MemoryError> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_id, key, value, embedding, importance, access_count,
                    ttl_days, created_at, updated_at
             FROM memory_entries",
        )?;
        let rows = stmt.query_map([], row_to_entry)?;
        rows.filter_map(|r| r.ok()).collect::<Result<Vec<_>, _>>()
    }
}

fn task_status_str(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Processing => "processing",
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::Cancelled => "cancelled",
    }
}

fn row_to_preference(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<UserPreference, MemoryError>> {
    let user_id: String = row.get(0)?;
    let custom_json: String = row.get(5)?;
    let parsed = (|| -> Result<UserPreference, MemoryError> {
        Ok(UserPreference {
            user_id: SenderId::from(user_id.as_str()),
            preferred_language: row.get(1)?,
            code_style: row.get(2)?,
            communication_style: row.get(3)?,
            timezone: row.get(4)?,
            custom_settings: serde_json::from_str(&custom_json)
                .map_err(|e| MemoryError::Serialization(e.to_string()))?,
        })
    })();
    Ok(parsed)
}

fn row_to_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<InteractionHistoryRecord, MemoryError>> {
    let session_id: String = row.get(0)?;
    let user_id: String = row.get(1)?;
    let outcome_str: String = row.get(3)?;
    let file_changes_json: String = row.get(4)?;
    let timestamp_str: String = row.get(6)?;

    let parsed = (|| -> Result<InteractionHistoryRecord, MemoryError> {
        Ok(InteractionHistoryRecord {
            session_id: SessionId::from(session_id.as_str()),
            user_id: SenderId::from(user_id.as_str()),
            task_summary: row.get(2)?,
            outcome: match outcome_str.as_str() {
                "pending" => TaskStatus::Pending,
                "processing" => TaskStatus::Processing,
                "completed" => TaskStatus::Completed,
                "failed" => TaskStatus::Failed,
                _ => TaskStatus::Cancelled,
            },
            file_changes: serde_json::from_str::<Vec<FileChange>>(&file_changes_json)
                .map_err(|e| MemoryError::Serialization(e.to_string()))?,
            duration_seconds: row.get(5)?,
            timestamp: timestamp_str
                .parse()
                .map_err(|_| MemoryError::Serialization("bad timestamp".into()))?,
        })
    })();
    Ok(parsed)
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<MemoryEntry, MemoryError>> {
    let embedding_json: Option<String> = row.get(4)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    let parsed = (|| -> Result<MemoryEntry, MemoryError> {
        Ok(MemoryEntry {
            id: row.get(0)?,
            user_id: row.get(1)?,
            key: row.get(2)?,
            value: row.get(3)?,
            embedding: embedding_json
                .map(|s| serde_json::from_str(&s))
                .transpose()
                .map_err(|e: serde_json::Error| MemoryError::Serialization(e.to_string()))?,
            importance: row.get(5)?,
            access_count: row.get::<_, i64>(6)? as u32,
            ttl_days: row.get(7)?,
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

    fn manager() -> MemoryManager {
        let conn = Connection::open_in_memory().unwrap();
        init_db(&conn).unwrap();
        MemoryManager::new(conn)
    }

    #[test]
    fn preference_round_trips() {
        let mgr = manager();
        let pref = UserPreference {
            user_id: SenderId::from("u1"),
            preferred_language: Some("rust".into()),
            code_style: None,
            communication_style: None,
            timezone: None,
            custom_settings: Default::default(),
        };
        mgr.save_preference(&pref).unwrap();
        let loaded = mgr.load_preference(&SenderId::from("u1")).unwrap().unwrap();
        assert_eq!(loaded.preferred_language.as_deref(), Some("rust"));
    }

    #[test]
    fn search_relevant_falls_back_to_keyword_overlap() {
        let mgr = manager();
        mgr.learn("u2", "project", "working on a login bug fix", 0.8, 90).unwrap();
        mgr.learn("u2", "unrelated", "favorite color is blue", 0.5, 90).unwrap();
        let hits = mgr.search_relevant("u2", "login bug", 5, 0.1).unwrap();
        assert_eq!(hits[0].entry.key, "project");
    }

    #[test]
    fn higher_importance_wins_on_upsert() {
        let mgr = manager();
        mgr.learn("u3", "k", "low importance value", 0.2, 90).unwrap();
        mgr.learn("u3", "k", "high importance value", 0.9, 90).unwrap();
        let entries = mgr.load_entries("u3").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].importance, 0.9);
        assert_eq!(entries[0].value, "high importance value");
    }
}
