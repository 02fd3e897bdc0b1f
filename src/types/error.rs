//! Unified error types for the conversations core
//!
//! All errors are serializable so the embedding web layer can ship them to
//! its presentation code unchanged. `NotFound` deliberately covers both
//! "does not exist" and "owned by someone else": a caller must never be
//! able to distinguish another user's data from missing data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ConversationError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Message quota reached: {0} messages stored")]
    QuotaExceeded(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A conversation with zero messages. The creation protocol always
    /// seeds one, so hitting this means an invariant broke elsewhere.
    #[error("Conversation {0} has no messages")]
    EmptyConversation(i64),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),
}

// Implement From for common error types

impl From<rusqlite::Error> for ConversationError {
    fn from(err: rusqlite::Error) -> Self {
        ConversationError::Database(err.to_string())
    }
}

impl From<r2d2::Error> for ConversationError {
    fn from(err: r2d2::Error) -> Self {
        ConversationError::Database(err.to_string())
    }
}

impl From<std::io::Error> for ConversationError {
    fn from(err: std::io::Error) -> Self {
        ConversationError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ConversationError {
    fn from(err: toml::de::Error) -> Self {
        ConversationError::Config(err.to_string())
    }
}

/// Result type alias using ConversationError
pub type Result<T> = std::result::Result<T, ConversationError>;
