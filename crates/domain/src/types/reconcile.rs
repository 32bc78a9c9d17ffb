//! Reconciliation outcomes and natural keys

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::EntityType;
use crate::impl_wire_name_conversions;

/// Per-record (or per-line) result of an idempotent upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationOutcome {
    Inserted,
    Updated,
    /// Incoming record matches the stored one; nothing was written.
    Skipped,
}

impl_wire_name_conversions!(ReconciliationOutcome {
    Inserted => "INSERTED",
    Updated => "UPDATED",
    Skipped => "SKIPPED",
});

/// Insert / update / skip counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
}

impl ReconcileStats {
    pub fn record(&mut self, outcome: ReconciliationOutcome) {
        match outcome {
            ReconciliationOutcome::Inserted => self.inserted += 1,
            ReconciliationOutcome::Updated => self.updated += 1,
            ReconciliationOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }

    pub fn total(&self) -> u64 {
        self.inserted + self.updated + self.skipped
    }
}

/// Externally meaningful identifier of a header record.
///
/// Rendered as `ENTITY:part/part`, which is also the stored key column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    pub entity_type: EntityType,
    pub parts: Vec<String>,
}

impl NaturalKey {
    pub fn new<I, S>(entity_type: EntityType, parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { entity_type, parts: parts.into_iter().map(Into::into).collect() }
    }

    /// Key of a line owned by this header.
    pub fn line_key(&self, line_num: i64) -> String {
        format!("{self}#{line_num}")
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.parts.join("/"))
    }
}

/// What the local store did for one header + lines unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertReport {
    pub outcome: ReconciliationOutcome,
    pub lines: ReconcileStats,
}

impl UpsertReport {
    pub fn skipped(line_count: u64) -> Self {
        Self {
            outcome: ReconciliationOutcome::Skipped,
            lines: ReconcileStats { skipped: line_count, ..ReconcileStats::default() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_record_and_merge() {
        let mut stats = ReconcileStats::default();
        stats.record(ReconciliationOutcome::Inserted);
        stats.record(ReconciliationOutcome::Inserted);
        stats.record(ReconciliationOutcome::Skipped);

        let mut total = ReconcileStats { updated: 4, ..Default::default() };
        total.merge(&stats);

        assert_eq!(total, ReconcileStats { inserted: 2, updated: 4, skipped: 1 });
        assert_eq!(total.total(), 7);
    }

    #[test]
    fn natural_key_rendering() {
        let key = NaturalKey::new(EntityType::Dispatches, ["201", "12345"]);
        assert_eq!(key.to_string(), "DISPATCHES:201/12345");
        assert_eq!(key.line_key(3), "DISPATCHES:201/12345#3");
    }

    #[test]
    fn outcome_wire_names() {
        assert_eq!(serde_json::to_string(&ReconciliationOutcome::Skipped).unwrap(), "\"SKIPPED\"");
        assert_eq!("updated".parse::<ReconciliationOutcome>().unwrap(), ReconciliationOutcome::Updated);
    }
}
