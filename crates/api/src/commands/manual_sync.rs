//! Operator-triggered sync of a single dispatch
//!
//! Always answers with the `{success, message, data?}` envelope, including
//! for bodies that do not parse; failures keep the status code of the
//! underlying error.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use erpsync_core::{ManualSyncResult, ManualSyncStats};
use erpsync_domain::{ReconciliationOutcome, SyncError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::context::AppContext;
use crate::error::status_for;
use crate::utils::logging::log_operation;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SingleDispatchRequest {
    #[serde(rename = "tipoDespacho", alias = "dispatch_type")]
    pub dispatch_type: i64,
    #[serde(rename = "docNum", alias = "doc_num")]
    pub doc_num: i64,
}

#[derive(Debug, Serialize)]
pub struct SingleDispatchData {
    #[serde(rename = "tipoDespacho")]
    pub dispatch_type: i64,
    #[serde(rename = "docNum")]
    pub doc_num: i64,
    #[serde(rename = "numeroDespacho")]
    pub numero_despacho: Value,
    #[serde(rename = "numeroBusqueda")]
    pub numero_busqueda: Value,
    #[serde(rename = "codigoCliente")]
    pub codigo_cliente: Value,
    #[serde(rename = "nombreCliente")]
    pub nombre_cliente: Value,
    pub action: ReconciliationOutcome,
    pub stats: ManualSyncStats,
    pub processing_time: f64,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub async fn sync_single_dispatch(
    State(ctx): State<Arc<AppContext>>,
    payload: Result<Json<SingleDispatchRequest>, JsonRejection>,
) -> (StatusCode, Json<Envelope<SingleDispatchData>>) {
    let SingleDispatchRequest { dispatch_type, doc_num } = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let (status, reason) = (rejection.status(), rejection.body_text());
            warn!(%status, reason = %reason, "Rejected manual sync request");
            let message = format!("Invalid request: {reason}");
            return (status, Json(Envelope { success: false, message, data: None }));
        }
    };
    info!(dispatch_type, doc_num, "Manual dispatch sync requested");

    let started = Instant::now();
    let outcome = ctx.manual_sync.sync_dispatch(dispatch_type, doc_num).await;
    log_operation("sync::single_dispatch", started.elapsed(), outcome.as_ref().map(|_| ()));

    match outcome {
        Ok(result) => {
            let message = success_message(&result, dispatch_type, doc_num);
            let data = SingleDispatchData::from_result(result, dispatch_type, doc_num);
            (StatusCode::OK, Json(Envelope { success: true, message, data: Some(data) }))
        }
        Err(err) => {
            let (status, _) = status_for(&err);
            let message = failure_message(&err, dispatch_type, doc_num);
            (status, Json(Envelope { success: false, message, data: None }))
        }
    }
}

impl SingleDispatchData {
    fn from_result(result: ManualSyncResult, dispatch_type: i64, doc_num: i64) -> Self {
        let field = |name: &str| result.record.get(name).cloned().unwrap_or(Value::Null);
        Self {
            dispatch_type,
            doc_num,
            numero_despacho: field("numeroDespacho"),
            numero_busqueda: field("numeroBusqueda"),
            codigo_cliente: field("codigoCliente"),
            nombre_cliente: field("nombreCliente"),
            action: result.action,
            stats: result.stats,
            processing_time: result.processing_time,
        }
    }
}

fn success_message(result: &ManualSyncResult, dispatch_type: i64, doc_num: i64) -> String {
    let verb = match result.action {
        ReconciliationOutcome::Inserted => "inserted",
        ReconciliationOutcome::Updated => "updated",
        ReconciliationOutcome::Skipped => "already up to date",
    };
    format!("Dispatch {dispatch_type}/{doc_num} {verb}")
}

fn failure_message(err: &SyncError, dispatch_type: i64, doc_num: i64) -> String {
    match err {
        SyncError::NotFound(_) => {
            format!("Dispatch {dispatch_type}/{doc_num} was not found in the ERP")
        }
        other => format!("Dispatch {dispatch_type}/{doc_num} could not be synced: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_erp_and_snake_case_names() {
        let erp: SingleDispatchRequest =
            serde_json::from_str(r#"{"tipoDespacho": 201, "docNum": 12345}"#).unwrap();
        let snake: SingleDispatchRequest =
            serde_json::from_str(r#"{"dispatch_type": 201, "doc_num": 12345}"#).unwrap();

        assert_eq!((erp.dispatch_type, erp.doc_num), (201, 12345));
        assert_eq!((snake.dispatch_type, snake.doc_num), (201, 12345));
    }

    #[test]
    fn not_found_message_names_the_document() {
        let message = failure_message(&SyncError::NotFound("x".into()), 202, 7);
        assert_eq!(message, "Dispatch 202/7 was not found in the ERP");
    }
}
