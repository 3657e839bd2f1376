//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Users table
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Chat sessions table
        CREATE TABLE IF NOT EXISTS chat_sessions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            title TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Most-recent-first session listings per user
        CREATE INDEX IF NOT EXISTS idx_chat_sessions_user_updated
            ON chat_sessions(user_id, updated_at);

        -- Chat messages table
        CREATE TABLE IF NOT EXISTS chat_messages (
            id TEXT PRIMARY KEY,
            session_id TEXT NOT NULL REFERENCES chat_sessions(id) ON DELETE CASCADE,
            role TEXT NOT NULL CHECK(role IN ('USER', 'ASSISTANT')),
            content TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );

        -- Ordered history lookups per session
        CREATE INDEX IF NOT EXISTS idx_chat_messages_session_ts
            ON chat_messages(session_id, timestamp);

        PRAGMA user_version = 1;
        ",
    )?;

    tracing::info!("migrated to schema v1");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_sets_version() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_init_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();
        init(&conn).unwrap();
    }

    #[test]
    fn test_history_index_exists() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();

        let columns: Vec<String> = conn
            .prepare("SELECT name FROM pragma_index_info('idx_chat_messages_session_ts')")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        assert_eq!(columns, vec!["session_id", "timestamp"]);
    }

    #[test]
    fn test_role_check_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        init(&conn).unwrap();

        conn.execute("INSERT INTO users (id) VALUES ('u')", []).unwrap();
        conn.execute(
            "INSERT INTO chat_sessions (id, user_id, title, created_at, updated_at)
             VALUES ('s', 'u', 't', 'now', 'now')",
            [],
        )
        .unwrap();

        let bad = conn.execute(
            "INSERT INTO chat_messages (id, session_id, role, content, timestamp)
             VALUES ('m', 's', 'SYSTEM', 'x', 'now')",
            [],
        );
        assert!(bad.is_err());
    }
}
