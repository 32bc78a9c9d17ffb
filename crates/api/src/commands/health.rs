//! Liveness and database health

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub version: &'static str,
}

pub async fn health(State(ctx): State<Arc<AppContext>>) -> (StatusCode, Json<HealthResponse>) {
    let db = Arc::clone(&ctx.db);
    let healthy = match tokio::task::spawn_blocking(move || db.health_check()).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            warn!(error = %err, "Database health check failed");
            false
        }
        Err(err) => {
            warn!(error = %err, "Database health check panicked");
            false
        }
    };

    let (status, body) = if healthy {
        (StatusCode::OK, HealthResponse { status: "ok", database: "ok", version: env!("CARGO_PKG_VERSION") })
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            HealthResponse { status: "degraded", database: "unavailable", version: env!("CARGO_PKG_VERSION") },
        )
    };
    (status, Json(body))
}
