//! Pure insert / update / skip decision for one reconciliation unit

use std::collections::HashMap;

use erpsync_domain::{ReconcileStats, ReconciliationOutcome, UpsertReport};

use super::strategy::ReconcileUnit;

/// Fingerprints of what is currently stored for a natural key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredFingerprints {
    pub header: String,
    /// Line fingerprints keyed by line number.
    pub lines: HashMap<i64, String>,
}

/// What to write for a unit; `lines` is aligned with `unit.lines`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertPlan {
    pub header: ReconciliationOutcome,
    pub lines: Vec<ReconciliationOutcome>,
}

impl UpsertPlan {
    pub fn report(&self) -> UpsertReport {
        let mut lines = ReconcileStats::default();
        for outcome in &self.lines {
            lines.record(*outcome);
        }
        UpsertReport { outcome: self.header, lines }
    }

    pub fn writes_anything(&self) -> bool {
        self.header != ReconciliationOutcome::Skipped
    }
}

/// Decide the minimal write for `unit` given what is stored.
///
/// Lines are matched by line number. Stored lines missing from the incoming
/// record are not part of the plan and stay untouched. The header is
/// SKIPPED only when its fingerprint and every incoming line are unchanged.
pub fn plan_upsert(existing: Option<&StoredFingerprints>, unit: &ReconcileUnit) -> UpsertPlan {
    let Some(stored) = existing else {
        return UpsertPlan {
            header: ReconciliationOutcome::Inserted,
            lines: vec![ReconciliationOutcome::Inserted; unit.lines.len()],
        };
    };

    let lines: Vec<ReconciliationOutcome> = unit
        .lines
        .iter()
        .map(|line| match stored.lines.get(&line.line_num) {
            None => ReconciliationOutcome::Inserted,
            Some(fp) if *fp == line.fingerprint => ReconciliationOutcome::Skipped,
            Some(_) => ReconciliationOutcome::Updated,
        })
        .collect();

    let header_unchanged = stored.header == unit.header.fingerprint;
    let lines_unchanged = lines.iter().all(|o| *o == ReconciliationOutcome::Skipped);

    let header = if header_unchanged && lines_unchanged {
        ReconciliationOutcome::Skipped
    } else {
        ReconciliationOutcome::Updated
    };

    UpsertPlan { header, lines }
}
