//! Error types for the Fluento conversation service

use thiserror::Error;

/// Result type alias for Fluento operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the conversation service
#[derive(Debug, Error)]
pub enum Error {
    /// No caller identity was supplied
    #[error("unauthorized")]
    Unauthorized,

    /// Request payload failed validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Completion provider returned an error
    #[error("provider error: {0}")]
    Provider(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`] as seen by a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No caller identity
    Unauthorized,
    /// Rejected input (e.g. empty message)
    InvalidInput,
    /// Requested session does not exist for this caller
    NotFound,
    /// Store, provider, or environment failure
    UpstreamFailure,
}

impl Error {
    /// Classify this error for the caller
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Config(_)
            | Self::Provider(_)
            | Self::Database(_)
            | Self::Sqlite(_)
            | Self::Http(_)
            | Self::Serialization(_)
            | Self::Toml(_)
            | Self::Io(_) => ErrorKind::UpstreamFailure,
        }
    }
}
