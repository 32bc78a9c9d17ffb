//! # ErpSync API
//!
//! HTTP console surface and process entry point.
//!
//! This crate contains:
//! - Axum handlers for sync configuration, sync control and manual sync
//! - Application context (dependency injection)
//! - Logging setup for the binary
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture

pub mod commands;
pub mod context;
pub mod error;
pub mod utils;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

pub use context::AppContext;
pub use error::{ApiError, ApiResult};

/// All console routes over a shared context.
pub fn router(ctx: Arc<AppContext>) -> Router {
    use commands::{dispatch, health, manual_sync, sync, sync_config};

    Router::new()
        .route("/health", get(health::health))
        .route("/sync-config/", get(sync_config::list_sync_configs))
        .route(
            "/sync-config/{entity_type}",
            get(sync_config::get_sync_config).put(sync_config::update_sync_config),
        )
        .route("/sync/status", get(sync::sync_status))
        .route("/sync/dispatch-types", get(sync::dispatch_types))
        .route("/sync/single-dispatch", post(manual_sync::sync_single_dispatch))
        .route("/sync/{entity_type}", post(sync::trigger_sync))
        .route("/dispatch/{dispatch_type}/{doc_num}", get(dispatch::dispatch_presence))
        .with_state(ctx)
}
