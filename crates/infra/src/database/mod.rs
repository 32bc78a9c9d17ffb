//! SQLite persistence for the local mirror and the sync configuration

pub mod local_store;
pub mod manager;
pub mod sync_config_repository;

use chrono::{DateTime, Utc};
use erpsync_domain::SyncError;
use tokio::task;

pub use local_store::SqliteLocalStore;
pub use manager::{DbManager, SqliteConnection, SqlitePool};
pub use sync_config_repository::SqliteSyncConfigRepository;

use crate::errors::InfraError;

pub(crate) fn map_sql_error(err: rusqlite::Error) -> SyncError {
    SyncError::from(InfraError::from(err))
}

pub(crate) fn map_join_error(err: task::JoinError) -> SyncError {
    if err.is_cancelled() {
        SyncError::Internal("blocking task cancelled".into())
    } else {
        SyncError::Internal(format!("blocking task failed: {err}"))
    }
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(millis: i64) -> Result<DateTime<Utc>, SyncError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| SyncError::Storage(format!("stored timestamp {millis} is out of range")))
}
