//! Per-entity synchronization configuration
//!
//! One [`SyncConfig`] row exists per [`EntityType`]. Operators tune it through
//! [`SyncConfigPatch`]; the scheduler only ever touches the bookkeeping pair
//! `last_sync_at` / `next_sync_at` through [`SyncConfig::record_run`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::entity::EntityType;
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_SYNC_INTERVAL_MINUTES};
use crate::{Result, SyncError};

/// Upper bound on the cadence (one year) so timestamp arithmetic stays finite.
pub const MAX_SYNC_INTERVAL_MINUTES: i64 = 525_600;

/// Upper bound on the ERP page size.
pub const MAX_BATCH_SIZE: i64 = 10_000;

/// Upper bound on per-page retries.
pub const MAX_RETRIES_LIMIT: i64 = 20;

/// Operator-tunable schedule plus scheduler bookkeeping for one entity type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub entity_type: EntityType,
    pub sync_enabled: bool,
    pub sync_interval_minutes: i64,
    pub batch_size: i64,
    pub max_retries: i64,
    pub api_endpoint: String,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub next_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncConfig {
    /// Seed row for an entity type that has never been configured.
    pub fn seed(entity_type: EntityType, now: DateTime<Utc>) -> Self {
        Self {
            entity_type,
            sync_enabled: true,
            sync_interval_minutes: DEFAULT_SYNC_INTERVAL_MINUTES,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            api_endpoint: entity_type.default_endpoint().to_string(),
            last_sync_at: None,
            next_sync_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Cadence as a duration.
    pub fn interval(&self) -> Duration {
        Duration::minutes(self.sync_interval_minutes.clamp(1, MAX_SYNC_INTERVAL_MINUTES))
    }

    /// Page size the paging loop should request.
    pub fn page_size(&self) -> usize {
        usize::try_from(self.batch_size.clamp(1, MAX_BATCH_SIZE)).unwrap_or(1)
    }

    /// Per-page retry ceiling.
    pub fn retry_limit(&self) -> u32 {
        u32::try_from(self.max_retries.clamp(0, MAX_RETRIES_LIMIT)).unwrap_or(0)
    }

    /// An enabled entity is due when it never ran or its next run has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.sync_enabled && self.next_sync_at.map_or(true, |next| next <= now)
    }

    /// Record a finished run, whatever its status.
    pub fn record_run(&mut self, now: DateTime<Utc>) {
        self.last_sync_at = Some(now);
        self.next_sync_at = Some(now + self.interval());
        self.updated_at = now;
    }

    /// Apply a validated operator patch.
    ///
    /// A changed interval moves `next_sync_at` to `last_sync_at + interval`;
    /// an entity that never ran stays due.
    pub fn apply(&mut self, patch: &SyncConfigPatch, now: DateTime<Utc>) -> Result<()> {
        patch.validate()?;

        if let Some(enabled) = patch.sync_enabled {
            self.sync_enabled = enabled;
        }
        if let Some(batch_size) = patch.batch_size {
            self.batch_size = batch_size;
        }
        if let Some(max_retries) = patch.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(endpoint) = &patch.api_endpoint {
            self.api_endpoint = endpoint.trim().to_string();
        }
        if let Some(interval) = patch.sync_interval_minutes {
            if interval != self.sync_interval_minutes {
                self.sync_interval_minutes = interval;
                if let Some(last) = self.last_sync_at {
                    self.next_sync_at = Some(last + self.interval());
                }
            }
        }

        self.updated_at = now;
        Ok(())
    }
}

/// Partial update of the operator-tunable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SyncConfigPatch {
    #[serde(default)]
    pub sync_enabled: Option<bool>,
    #[serde(default)]
    pub sync_interval_minutes: Option<i64>,
    #[serde(default)]
    pub batch_size: Option<i64>,
    #[serde(default)]
    pub max_retries: Option<i64>,
    #[serde(default)]
    pub api_endpoint: Option<String>,
}

impl SyncConfigPatch {
    /// Reject invalid tunables before they reach the store.
    pub fn validate(&self) -> Result<()> {
        if let Some(interval) = self.sync_interval_minutes {
            if interval <= 0 {
                return Err(SyncError::Config(format!(
                    "sync_interval_minutes must be positive, got {interval}"
                )));
            }
            if interval > MAX_SYNC_INTERVAL_MINUTES {
                return Err(SyncError::Config(format!(
                    "sync_interval_minutes must not exceed {MAX_SYNC_INTERVAL_MINUTES}, got {interval}"
                )));
            }
        }
        if let Some(batch_size) = self.batch_size {
            if batch_size <= 0 || batch_size > MAX_BATCH_SIZE {
                return Err(SyncError::Config(format!(
                    "batch_size must be between 1 and {MAX_BATCH_SIZE}, got {batch_size}"
                )));
            }
        }
        if let Some(max_retries) = self.max_retries {
            if !(0..=MAX_RETRIES_LIMIT).contains(&max_retries) {
                return Err(SyncError::Config(format!(
                    "max_retries must be between 0 and {MAX_RETRIES_LIMIT}, got {max_retries}"
                )));
            }
        }
        if let Some(endpoint) = &self.api_endpoint {
            if endpoint.trim().is_empty() {
                return Err(SyncError::Config("api_endpoint must not be empty".into()));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn seed_uses_defaults_and_is_due() {
        let config = SyncConfig::seed(EntityType::Dispatches, at(8, 0));
        assert!(config.sync_enabled);
        assert_eq!(config.sync_interval_minutes, 60);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.api_endpoint, "/Transaction/Orders");
        assert!(config.is_due(at(8, 0)));
    }

    #[test]
    fn record_run_sets_next_from_interval() {
        let mut config = SyncConfig::seed(EntityType::Items, at(8, 0));
        config.sync_interval_minutes = 15;
        config.record_run(at(9, 0));

        assert_eq!(config.last_sync_at, Some(at(9, 0)));
        assert_eq!(config.next_sync_at, Some(at(9, 15)));
        assert!(!config.is_due(at(9, 14)));
        assert!(config.is_due(at(9, 15)));
    }

    #[test]
    fn disabled_entity_is_never_due() {
        let mut config = SyncConfig::seed(EntityType::Items, at(8, 0));
        config.sync_enabled = false;
        assert!(!config.is_due(at(23, 0)));
    }

    #[test]
    fn interval_change_recomputes_next_from_last_run() {
        let mut config = SyncConfig::seed(EntityType::GoodsReceipts, at(8, 0));
        config.record_run(at(9, 0));

        let patch = SyncConfigPatch { sync_interval_minutes: Some(30), ..Default::default() };
        config.apply(&patch, at(9, 5)).unwrap();

        assert_eq!(config.next_sync_at, Some(at(9, 30)));
        assert_eq!(config.updated_at, at(9, 5));
    }

    #[test]
    fn interval_change_keeps_never_run_entity_due() {
        let mut config = SyncConfig::seed(EntityType::GoodsReceipts, at(8, 0));
        let patch = SyncConfigPatch { sync_interval_minutes: Some(5), ..Default::default() };
        config.apply(&patch, at(8, 1)).unwrap();
        assert!(config.next_sync_at.is_none());
        assert!(config.is_due(at(8, 1)));
    }

    #[test]
    fn invalid_patches_are_config_errors() {
        let cases = [
            SyncConfigPatch { sync_interval_minutes: Some(0), ..Default::default() },
            SyncConfigPatch { sync_interval_minutes: Some(-5), ..Default::default() },
            SyncConfigPatch { batch_size: Some(0), ..Default::default() },
            SyncConfigPatch { max_retries: Some(-1), ..Default::default() },
            SyncConfigPatch { api_endpoint: Some("  ".into()), ..Default::default() },
        ];

        for patch in cases {
            assert!(
                matches!(patch.validate(), Err(SyncError::Config(_))),
                "patch should be rejected: {patch:?}"
            );
        }
    }

    #[test]
    fn rejected_patch_leaves_config_untouched() {
        let mut config = SyncConfig::seed(EntityType::Items, at(8, 0));
        let before = config.clone();
        let patch = SyncConfigPatch {
            sync_enabled: Some(false),
            batch_size: Some(-3),
            ..Default::default()
        };
        assert!(config.apply(&patch, at(8, 30)).is_err());
        assert_eq!(config, before);
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let result: std::result::Result<SyncConfigPatch, _> =
            serde_json::from_str(r#"{"entity_type": "ITEMS"}"#);
        assert!(result.is_err());
    }
}
