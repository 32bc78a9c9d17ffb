//! Pure scheduling decision

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use erpsync_domain::{EntityType, SyncConfig};

/// Scheduler view of one entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub entity_type: EntityType,
    pub enabled: bool,
    pub interval_minutes: i64,
    pub next_sync_at: Option<DateTime<Utc>>,
    /// A run holds the entity's lease.
    pub in_flight: bool,
}

impl ScheduleEntry {
    fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && !self.in_flight && self.next_sync_at.map_or(true, |next| next <= now)
    }
}

/// Explicit scheduler state, rebuilt from the config store on every tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerState {
    pub entries: BTreeMap<EntityType, ScheduleEntry>,
}

impl SchedulerState {
    /// Build state from freshly read configs and the entities currently
    /// holding a lease.
    pub fn from_configs(configs: &[SyncConfig], in_flight: &HashSet<EntityType>) -> Self {
        let entries = configs
            .iter()
            .map(|config| {
                let entry = ScheduleEntry {
                    entity_type: config.entity_type,
                    enabled: config.sync_enabled,
                    interval_minutes: config.sync_interval_minutes,
                    next_sync_at: config.next_sync_at,
                    in_flight: in_flight.contains(&config.entity_type),
                };
                (config.entity_type, entry)
            })
            .collect();
        Self { entries }
    }

    pub fn in_flight(&self) -> Vec<EntityType> {
        self.entries.values().filter(|e| e.in_flight).map(|e| e.entity_type).collect()
    }
}

/// Select the entities to start at `now`.
///
/// An entity starts when it is enabled, not in flight and its
/// `next_sync_at` is unset or has elapsed. Selected entities come back
/// marked in flight, so a second tick on the returned state selects
/// nothing new.
pub fn tick(mut state: SchedulerState, now: DateTime<Utc>) -> (SchedulerState, Vec<EntityType>) {
    let mut to_start = Vec::new();
    for entry in state.entries.values_mut() {
        if entry.is_due(now) {
            entry.in_flight = true;
            to_start.push(entry.entity_type);
        }
    }
    (state, to_start)
}
