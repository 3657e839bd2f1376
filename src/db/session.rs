//! Chat session repository for CRUD operations

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use rusqlite::{OptionalExtension, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

use super::DbPool;
use super::user::UserRepo;
use crate::{Error, Result};

/// A user-owned chat session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single immutable message in a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Author of a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    /// Stored column value
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Assistant => "ASSISTANT",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Self::User),
            "ASSISTANT" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// Chat session repository
#[derive(Clone)]
pub struct SessionRepo {
    pool: DbPool,
}

impl SessionRepo {
    /// Create a new session repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a session by ID, only if it belongs to `owner_id`
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str, owner_id: &str) -> Result<Option<ChatSession>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.query_row(
            "SELECT id, user_id, title, created_at, updated_at
             FROM chat_sessions WHERE id = ?1 AND user_id = ?2",
            [id, owner_id],
            row_to_session,
        )
        .optional()
        .map_err(|e| Error::Database(e.to_string()))
    }

    /// Create a new session owned by `owner_id`
    ///
    /// The owning user row is created on first use.
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn create(&self, owner_id: &str, title: &str) -> Result<ChatSession> {
        let owner = UserRepo::new(self.pool.clone()).find_or_create(owner_id)?;

        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now().trunc_subsecs(6);
        let now_str = format_timestamp(now);

        conn.execute(
            "INSERT INTO chat_sessions (id, user_id, title, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![id, owner.id, title, now_str],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        tracing::debug!(session_id = %id, owner_id = %owner.id, "created chat session");

        Ok(ChatSession {
            id,
            user_id: owner.id,
            title: title.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    /// List sessions owned by a user, most recently active first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn list_for_user(&self, owner_id: &str) -> Result<Vec<ChatSession>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, title, created_at, updated_at
                 FROM chat_sessions WHERE user_id = ?1
                 ORDER BY updated_at DESC, rowid DESC",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let sessions = stmt
            .query_map([owner_id], row_to_session)
            .map_err(|e| Error::Database(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(sessions)
    }

    /// Append a message to a session
    ///
    /// The message timestamp is strictly greater than every earlier message in
    /// the session, even if the wall clock has not advanced. The write lock is
    /// taken up front so concurrent appenders wait instead of failing on the
    /// read-to-write upgrade.
    ///
    /// # Errors
    ///
    /// Returns error if the session does not exist or the database operation fails
    pub fn add_message(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatMessage> {
        let mut conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| Error::Database(e.to_string()))?;

        let latest: Option<String> = tx
            .query_row(
                "SELECT MAX(timestamp) FROM chat_messages WHERE session_id = ?1",
                [session_id],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut timestamp = Utc::now().trunc_subsecs(6);
        if let Some(latest) = latest.as_deref().map(parse_datetime) {
            if timestamp <= latest {
                timestamp = latest + Duration::microseconds(1);
            }
        }
        let ts_str = format_timestamp(timestamp);
        let id = Uuid::new_v4().to_string();

        tx.execute(
            "INSERT INTO chat_messages (id, session_id, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, session_id, role.as_str(), content, ts_str],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        tx.execute(
            "UPDATE chat_sessions SET updated_at = ?1 WHERE id = ?2",
            rusqlite::params![ts_str, session_id],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        tx.commit().map_err(|e| Error::Database(e.to_string()))?;

        Ok(ChatMessage {
            id,
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            timestamp,
        })
    }

    /// Get the most recent `limit` messages of a session, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn recent_messages(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, session_id, role, content, timestamp
                 FROM chat_messages WHERE session_id = ?1
                 ORDER BY timestamp DESC, rowid DESC LIMIT ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut messages = stmt
            .query_map(rusqlite::params![session_id, limit], row_to_message)
            .map_err(|e| Error::Database(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(e.to_string()))?;

        // Reverse to get chronological order
        messages.reverse();
        Ok(messages)
    }

    /// Get every message of a session, oldest first
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn messages(&self, session_id: &str) -> Result<Vec<ChatMessage>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, session_id, role, content, timestamp
                 FROM chat_messages WHERE session_id = ?1
                 ORDER BY timestamp ASC, rowid ASC",
            )
            .map_err(|e| Error::Database(e.to_string()))?;

        let messages = stmt
            .query_map([session_id], row_to_message)
            .map_err(|e| Error::Database(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(messages)
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatSession> {
    Ok(ChatSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        created_at: parse_datetime(&row.get::<_, String>(3)?),
        updated_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChatMessage> {
    let role: String = row.get(2)?;
    let role = MessageRole::parse(&role).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("unknown message role: {role}").into(),
        )
    })?;

    Ok(ChatMessage {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role,
        content: row.get(3)?,
        timestamp: parse_datetime(&row.get::<_, String>(4)?),
    })
}

/// Fixed-width RFC 3339 so lexical order matches chronological order
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
