//! User repository

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use super::DbPool;
use super::session::{format_timestamp, parse_datetime};
use crate::{Error, Result};

/// A user known to the tutor
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

/// User repository
#[derive(Clone)]
pub struct UserRepo {
    pool: DbPool,
}

impl UserRepo {
    /// Create a new user repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find or create a user
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find_or_create(&self, id: &str) -> Result<User> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        let now = Utc::now();
        conn.execute(
            "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
            [id, &format_timestamp(now)],
        )
        .map_err(|e| Error::Database(e.to_string()))?;

        conn.query_row(
            "SELECT id, created_at FROM users WHERE id = ?1",
            [id],
            row_to_user,
        )
        .map_err(|e| Error::Database(e.to_string()))
    }

    /// Find a user by ID (returns None if not found)
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn find(&self, id: &str) -> Result<Option<User>> {
        let conn = self
            .pool
            .get()
            .map_err(|e| Error::Database(e.to_string()))?;

        conn.query_row(
            "SELECT id, created_at FROM users WHERE id = ?1",
            [id],
            row_to_user,
        )
        .optional()
        .map_err(|e| Error::Database(e.to_string()))
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        created_at: parse_datetime(&row.get::<_, String>(1)?),
    })
}
