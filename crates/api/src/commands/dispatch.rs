//! Local presence check for one dispatch

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use erpsync_core::LocalStore;
use erpsync_domain::{EntityType, NaturalKey};
use serde::Serialize;

use crate::context::AppContext;
use crate::error::ApiResult;

#[derive(Debug, Serialize)]
pub struct DispatchPresence {
    pub exists: bool,
    pub lines_count: u64,
}

pub async fn dispatch_presence(
    State(ctx): State<Arc<AppContext>>,
    Path((dispatch_type, doc_num)): Path<(i64, i64)>,
) -> ApiResult<Json<DispatchPresence>> {
    let key =
        NaturalKey::new(EntityType::Dispatches, [dispatch_type.to_string(), doc_num.to_string()]);

    let exists = ctx.store.find_header(&key).await?.is_some();
    let lines_count = if exists { ctx.store.count_lines(&key).await? } else { 0 };

    Ok(Json(DispatchPresence { exists, lines_count }))
}
