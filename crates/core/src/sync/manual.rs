//! Operator-triggered reconciliation of exactly one document
//!
//! Shares [`Reconciler::upsert`] with the scheduled path, so a document
//! processed here yields the same outcome it would in a paged run. Nothing
//! here retries: the operator re-triggers.

use std::sync::Arc;
use std::time::Instant;

use erpsync_domain::{
    EntityType, NaturalKey, ReconciliationOutcome, Result, SyncError, UpsertReport,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::ports::{ErpGateway, ExternalRecord};
use crate::reconcile::{ReconcileStrategy, Reconciler};

/// Header and line counts of one manual sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualSyncStats {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
    pub lines_inserted: u64,
    pub lines_updated: u64,
    pub lines_skipped: u64,
}

impl From<&UpsertReport> for ManualSyncStats {
    fn from(report: &UpsertReport) -> Self {
        let mut stats = Self {
            lines_inserted: report.lines.inserted,
            lines_updated: report.lines.updated,
            lines_skipped: report.lines.skipped,
            ..Self::default()
        };
        match report.outcome {
            ReconciliationOutcome::Inserted => stats.inserted = 1,
            ReconciliationOutcome::Updated => stats.updated = 1,
            ReconciliationOutcome::Skipped => stats.skipped = 1,
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualSyncResult {
    pub entity_type: EntityType,
    pub key: NaturalKey,
    /// The document as fetched from the ERP.
    pub record: ExternalRecord,
    pub action: ReconciliationOutcome,
    pub stats: ManualSyncStats,
    /// Elapsed wall time in seconds.
    pub processing_time: f64,
}

pub struct ManualSyncService {
    gateway: Arc<dyn ErpGateway>,
    reconciler: Arc<Reconciler>,
}

impl ManualSyncService {
    pub fn new(gateway: Arc<dyn ErpGateway>, reconciler: Arc<Reconciler>) -> Self {
        Self { gateway, reconciler }
    }

    /// Fetch and reconcile the dispatch `{dispatch_type, doc_num}`.
    pub async fn sync_dispatch(&self, dispatch_type: i64, doc_num: i64) -> Result<ManualSyncResult> {
        self.sync_one(EntityType::Dispatches, &[dispatch_type.to_string(), doc_num.to_string()])
            .await
    }

    /// Fetch one document by natural key and upsert it.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` when `key_parts` do not form a key for `entity_type`
    /// - `NotFound` when the ERP has no such document
    /// - `Transport`/`RateLimited` when the ERP call fails
    /// - `MalformedRecord` when the returned document lacks its key or
    ///   carries a different one
    /// - `Storage` when the upsert fails
    #[instrument(skip(self), fields(entity_type = %entity_type))]
    pub async fn sync_one(
        &self,
        entity_type: EntityType,
        key_parts: &[String],
    ) -> Result<ManualSyncResult> {
        let started = Instant::now();
        let strategy = ReconcileStrategy::for_entity(entity_type);
        let key = strategy.key_from_parts(key_parts)?;

        let record = self.gateway.fetch_one(&key).await.inspect_err(|err| {
            warn!(key = %key, kind = err.kind(), error = %err, "manual sync fetch failed");
        })?;

        let fetched_key = strategy.natural_key_of(&record)?;
        if fetched_key != key {
            return Err(SyncError::MalformedRecord(format!(
                "requested {key} but the ERP returned {fetched_key}"
            )));
        }

        let report = self.reconciler.upsert(entity_type, &record).await.inspect_err(|err| {
            warn!(key = %key, kind = err.kind(), error = %err, "manual sync upsert failed");
        })?;

        let processing_time = started.elapsed().as_secs_f64();
        info!(
            key = %key,
            action = %report.outcome,
            lines_inserted = report.lines.inserted,
            lines_updated = report.lines.updated,
            lines_skipped = report.lines.skipped,
            processing_time,
            "manual sync finished"
        );

        Ok(ManualSyncResult {
            entity_type,
            key,
            record,
            action: report.outcome,
            stats: ManualSyncStats::from(&report),
            processing_time,
        })
    }
}
