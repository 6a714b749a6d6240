use rusqlite::{Connection, Result};

/// Initialise memory tables. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_sessions_table(conn)?;
    create_preferences_table(conn)?;
    create_interaction_history_table(conn)?;
    create_memory_entries_table(conn)?;
    Ok(())
}

fn create_sessions_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS sessions (
            session_id  TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL,
            platform    TEXT NOT NULL,
            status      TEXT NOT NULL,
            messages    TEXT NOT NULL,
            context_vars TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);",
    )
}

fn create_preferences_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS preferences (
            user_id             TEXT PRIMARY KEY,
            preferred_language  TEXT,
            code_style          TEXT,
            communication_style TEXT,
            timezone            TEXT,
            custom_settings     TEXT NOT NULL DEFAULT '{}'
        );",
    )
}

fn create_interaction_history_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS interaction_history (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id      TEXT NOT NULL,
            user_id         TEXT NOT NULL,
            task_summary    TEXT NOT NULL,
            outcome         TEXT NOT NULL,
            file_changes    TEXT NOT NULL DEFAULT '[]',
            duration_seconds REAL NOT NULL,
            timestamp       TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_history_user ON interaction_history(user_id, timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_history_session ON interaction_history(session_id, timestamp);",
    )
}

/// `memory_entries` carries the embedding/importance/TTL fields for the
/// richer memory type, kept alongside the lighter `preferences` row rather
/// than replacing it.
fn create_memory_entries_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS memory_entries (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT NOT NULL,
            key         TEXT NOT NULL,
            value       TEXT NOT NULL,
            embedding   TEXT,
            importance  REAL NOT NULL DEFAULT 0.5,
            access_count INTEGER NOT NULL DEFAULT 0,
            ttl_days    INTEGER NOT NULL DEFAULT 90,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL,
            UNIQUE(user_id, key)
        );
        CREATE INDEX IF NOT EXISTS idx_memory_user ON memory_entries(user_id);",
    )
}
