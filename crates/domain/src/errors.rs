//! Error types used throughout the engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the synchronization engine
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SyncError {
    /// ERP unreachable, timed out or answered with a server error.
    #[error("Transport error: {0}")]
    Transport(String),

    /// ERP asked us to slow down.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// ERP (or the local store) has no such document.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Record is missing its natural key or a required field.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid tunable or unknown entity type.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether a scheduled run may retry the failed page.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::RateLimited(_) | Self::Storage(_))
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::RateLimited(_) => "rate_limited",
            Self::NotFound(_) => "not_found",
            Self::MalformedRecord(_) => "malformed_record",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::Auth(_) => "auth",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, SyncError>;
