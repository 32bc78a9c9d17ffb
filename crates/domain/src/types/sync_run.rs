//! Summary of one scheduled synchronization run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::entity::EntityType;
use super::reconcile::{ReconcileStats, UpsertReport};
use crate::impl_wire_name_conversions;

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// ERP signalled no more pages.
    Completed,
    /// A non-retryable error stopped the run.
    Failed,
    /// Page retries were exhausted; earlier pages stay applied.
    Partial,
}

impl_wire_name_conversions!(RunStatus {
    Completed => "COMPLETED",
    Failed => "FAILED",
    Partial => "PARTIAL",
});

/// Ephemeral run summary, kept in memory and in logs only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRun {
    pub run_id: Uuid,
    pub entity_type: EntityType,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub pages_processed: u64,
    pub headers: ReconcileStats,
    pub lines: ReconcileStats,
    /// Records skipped because they lacked a natural key or required field.
    pub malformed: u64,
    pub status: RunStatus,
    pub last_error: Option<String>,
}

impl SyncRun {
    /// Start a run; status stays `Completed` unless the loop says otherwise.
    pub fn start(entity_type: EntityType, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            entity_type,
            started_at,
            finished_at: None,
            pages_processed: 0,
            headers: ReconcileStats::default(),
            lines: ReconcileStats::default(),
            malformed: 0,
            status: RunStatus::Completed,
            last_error: None,
        }
    }

    pub fn record(&mut self, report: &UpsertReport) {
        self.headers.record(report.outcome);
        self.lines.merge(&report.lines);
    }

    pub fn finish(&mut self, status: RunStatus, finished_at: DateTime<Utc>) {
        self.status = status;
        self.finished_at = Some(finished_at);
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at.map(|end| (end - self.started_at).num_milliseconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReconciliationOutcome;

    #[test]
    fn record_accumulates_header_and_line_counts() {
        let mut run = SyncRun::start(EntityType::Dispatches, Utc::now());
        run.record(&UpsertReport {
            outcome: ReconciliationOutcome::Inserted,
            lines: ReconcileStats { inserted: 3, ..Default::default() },
        });
        run.record(&UpsertReport::skipped(2));

        assert_eq!(run.headers, ReconcileStats { inserted: 1, updated: 0, skipped: 1 });
        assert_eq!(run.lines, ReconcileStats { inserted: 3, updated: 0, skipped: 2 });
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[test]
    fn finish_sets_status_and_end_time() {
        let started = Utc::now();
        let mut run = SyncRun::start(EntityType::Items, started);
        run.finish(RunStatus::Partial, started + chrono::Duration::seconds(2));
        assert_eq!(run.status, RunStatus::Partial);
        assert_eq!(run.duration_ms(), Some(2_000));
    }
}
