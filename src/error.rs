//! Error types for the courier relay

use thiserror::Error;

/// Result type alias for courier operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the courier relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Channel error
    #[error("channel error: {0}")]
    Channel(String),

    /// Text generation error
    #[error("generator error: {0}")]
    Generator(String),

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

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
