//! Scheduled sync control and status

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::Json;
use erpsync_core::EntityStatus;
use erpsync_domain::{DispatchType, EntityType, SyncRun};
use serde::Serialize;
use tracing::info;

use super::parse_entity;
use crate::context::AppContext;
use crate::error::{ApiError, ApiResult};
use crate::utils::logging::log_operation;

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub scheduler_running: bool,
    pub in_flight: Vec<EntityType>,
    pub entities: Vec<EntityStatus>,
}

/// Run one entity now through the scheduler's lease.
pub async fn trigger_sync(
    State(ctx): State<Arc<AppContext>>,
    Path(entity_type): Path<String>,
) -> ApiResult<Json<SyncRun>> {
    let entity_type = parse_entity(&entity_type)?;
    info!(entity_type = %entity_type, "Operator triggered sync");

    let started = Instant::now();
    let outcome = ctx.coordinator.run_now(entity_type).await;
    log_operation("sync::trigger", started.elapsed(), outcome.as_ref().map(|_| ()));

    match outcome? {
        Some(run) => Ok(Json(run)),
        None => Err(ApiError::conflict(format!("a {entity_type} sync is already in flight"))),
    }
}

pub async fn sync_status(State(ctx): State<Arc<AppContext>>) -> ApiResult<Json<SyncStatusResponse>> {
    let entities = ctx.coordinator.status().await?;
    let in_flight = entities.iter().filter(|e| e.in_flight).map(|e| e.entity_type).collect();

    Ok(Json(SyncStatusResponse {
        scheduler_running: ctx.scheduler_running().await,
        in_flight,
        entities,
    }))
}

pub async fn dispatch_types() -> Json<Vec<DispatchType>> {
    Json(DispatchType::CATALOGUE.to_vec())
}
