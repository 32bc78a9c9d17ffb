//! HTTP handlers for the operator console
//!
//! Each module owns one resource; [`crate::router`] mounts them.

pub mod dispatch;
pub mod health;
pub mod manual_sync;
pub mod sync;
pub mod sync_config;

use erpsync_domain::{EntityType, SyncError};

use crate::error::ApiResult;

/// Entity type from a path segment; the set is closed so an unknown name is
/// a bad request rather than a missing resource.
pub(crate) fn parse_entity(raw: &str) -> ApiResult<EntityType> {
    EntityType::parse(raw).map_err(|err| SyncError::InvalidInput(err.to_string()).into())
}
