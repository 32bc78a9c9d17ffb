//! ERP error classification
//!
//! Every failed ERP call is classified into an [`ErpErrorCategory`] before it
//! becomes a [`SyncError`], so "not found", "transport" and "rate limited"
//! stay distinguishable for the retry policy and the manual-sync response.

use std::fmt;

use erpsync_domain::SyncError;
use reqwest::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErpErrorCategory {
    /// ERP unreachable
    NetworkOffline,

    /// Request timed out
    NetworkTimeout,

    /// 5xx responses
    ServerUnavailable,

    /// Login rejected or token refused after one refresh (401, 403)
    Authentication,

    /// 429
    RateLimited,

    /// The document does not exist (404 or empty body)
    NotFound,

    /// Other 4xx
    Validation,

    /// Unparseable body
    MalformedResponse,

    Unknown,
}

impl ErpErrorCategory {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkOffline | Self::NetworkTimeout | Self::ServerUnavailable | Self::RateLimited
        )
    }
}

impl fmt::Display for ErpErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NetworkOffline => "Network Offline",
            Self::NetworkTimeout => "Network Timeout",
            Self::ServerUnavailable => "Server Unavailable",
            Self::Authentication => "Authentication Failed",
            Self::RateLimited => "Rate Limited",
            Self::NotFound => "Not Found",
            Self::Validation => "Validation Error",
            Self::MalformedResponse => "Malformed Response",
            Self::Unknown => "Unknown Error",
        };
        f.write_str(label)
    }
}

/// Classified ERP failure with optional context (URL, response excerpt).
#[derive(Debug, Clone)]
pub struct ErpError {
    category: ErpErrorCategory,
    message: String,
    context: Option<String>,
}

impl ErpError {
    pub fn new(category: ErpErrorCategory, message: impl Into<String>) -> Self {
        Self { category, message: message.into(), context: None }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn category(&self) -> ErpErrorCategory {
        self.category
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    pub fn from_status_code(status: StatusCode) -> Self {
        let category = match status.as_u16() {
            401 | 403 => ErpErrorCategory::Authentication,
            404 => ErpErrorCategory::NotFound,
            429 => ErpErrorCategory::RateLimited,
            400..=499 => ErpErrorCategory::Validation,
            500..=599 => ErpErrorCategory::ServerUnavailable,
            _ => ErpErrorCategory::Unknown,
        };

        Self::new(
            category,
            format!("HTTP {}: {}", status.as_u16(), status.canonical_reason().unwrap_or("Unknown")),
        )
    }

    pub fn into_sync_error(self) -> SyncError {
        let text = self.to_string();
        match self.category {
            ErpErrorCategory::NetworkOffline
            | ErpErrorCategory::NetworkTimeout
            | ErpErrorCategory::ServerUnavailable => SyncError::Transport(text),
            ErpErrorCategory::RateLimited => SyncError::RateLimited(text),
            ErpErrorCategory::Authentication => SyncError::Auth(text),
            ErpErrorCategory::NotFound => SyncError::NotFound(text),
            ErpErrorCategory::Validation => SyncError::InvalidInput(text),
            ErpErrorCategory::MalformedResponse => SyncError::MalformedRecord(text),
            ErpErrorCategory::Unknown => SyncError::Internal(text),
        }
    }
}

impl fmt::Display for ErpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({ctx})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErpError {}

impl From<ErpError> for SyncError {
    fn from(err: ErpError) -> Self {
        err.into_sync_error()
    }
}
