//! Reconciler core shared by scheduled and manual sync

use std::sync::Arc;

use erpsync_domain::{EntityType, ReconcileStats, Result, SyncError, UpsertReport};
use tracing::{debug, warn};

use super::strategy::ReconcileStrategy;
use crate::sync::ports::{ExternalRecord, LocalStore};

/// Aggregate outcome of reconciling one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOutcome {
    pub headers: ReconcileStats,
    pub lines: ReconcileStats,
    pub malformed: u64,
}

/// Maps external records and upserts them through the [`LocalStore`].
///
/// This is the only writer of entity records.
pub struct Reconciler {
    store: Arc<dyn LocalStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    /// Upsert one record.
    ///
    /// # Errors
    ///
    /// `MalformedRecord` when the key or a required field is missing; any
    /// store error otherwise.
    pub async fn upsert(
        &self,
        entity_type: EntityType,
        record: &ExternalRecord,
    ) -> Result<UpsertReport> {
        let unit = ReconcileStrategy::for_entity(entity_type).build_unit(record)?;
        let key = unit.key.to_string();
        let report = self.store.upsert_header_with_lines(unit).await?;

        debug!(
            entity_type = %entity_type,
            key = %key,
            outcome = %report.outcome,
            lines_inserted = report.lines.inserted,
            lines_updated = report.lines.updated,
            lines_skipped = report.lines.skipped,
            "record reconciled"
        );
        Ok(report)
    }

    /// Upsert every record of a page.
    ///
    /// Malformed records are logged and counted; they never abort the page.
    /// Any other error stops the page so the caller can retry it whole.
    pub async fn reconcile_page(
        &self,
        entity_type: EntityType,
        records: &[ExternalRecord],
    ) -> Result<PageOutcome> {
        let mut outcome = PageOutcome::default();
        self.reconcile_into(entity_type, records, &mut outcome).await?;
        Ok(outcome)
    }

    /// Like [`Reconciler::reconcile_page`], but counts into `outcome` as each
    /// record commits. When the page stops early, `outcome` still holds the
    /// records written before the failure.
    pub async fn reconcile_into(
        &self,
        entity_type: EntityType,
        records: &[ExternalRecord],
        outcome: &mut PageOutcome,
    ) -> Result<()> {
        for (index, record) in records.iter().enumerate() {
            match self.upsert(entity_type, record).await {
                Ok(report) => {
                    outcome.headers.record(report.outcome);
                    outcome.lines.merge(&report.lines);
                }
                Err(SyncError::MalformedRecord(reason)) => {
                    warn!(
                        entity_type = %entity_type,
                        index,
                        reason = %reason,
                        "skipping malformed record"
                    );
                    outcome.malformed += 1;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}
