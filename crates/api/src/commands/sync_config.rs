//! Sync configuration read/write

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use erpsync_domain::{SyncConfig, SyncConfigPatch};

use super::parse_entity;
use crate::context::AppContext;
use crate::error::ApiResult;

pub async fn list_sync_configs(
    State(ctx): State<Arc<AppContext>>,
) -> ApiResult<Json<Vec<SyncConfig>>> {
    Ok(Json(ctx.sync_configs.list().await?))
}

pub async fn get_sync_config(
    State(ctx): State<Arc<AppContext>>,
    Path(entity_type): Path<String>,
) -> ApiResult<Json<SyncConfig>> {
    let entity_type = parse_entity(&entity_type)?;
    Ok(Json(ctx.sync_configs.get(entity_type).await?))
}

/// Partial update; the scheduler picks the change up on its next tick.
pub async fn update_sync_config(
    State(ctx): State<Arc<AppContext>>,
    Path(entity_type): Path<String>,
    Json(patch): Json<SyncConfigPatch>,
) -> ApiResult<Json<SyncConfig>> {
    let entity_type = parse_entity(&entity_type)?;
    Ok(Json(ctx.sync_configs.update(entity_type, patch).await?))
}
