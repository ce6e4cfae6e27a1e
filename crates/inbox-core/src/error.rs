use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InboxError {
    #[error("Database configuration missing. Please set DATABASE_URL or [database] url in the config file")]
    DatabaseUnconfigured,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Stored response for sender {sender_id} at {created_at} is not valid JSON: {reason}")]
    MalformedResponse {
        sender_id: String,
        created_at: DateTime<Utc>,
        reason: String,
    },

    #[error("{0}")]
    NotFound(String),

    #[error("Missing required parameters: {0}")]
    MissingParameter(String),

    #[error("Invalid query parameters: {0}")]
    InvalidParameter(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, InboxError>;
