//! Validated reads and edits of per-entity sync configuration

use std::sync::Arc;

use erpsync_common::time::Clock;
use erpsync_domain::{EntityType, Result, SyncConfig, SyncConfigPatch};
use tracing::{info, instrument};

use super::ports::SyncConfigRepository;

pub struct SyncConfigService {
    repo: Arc<dyn SyncConfigRepository>,
    clock: Arc<dyn Clock>,
}

impl SyncConfigService {
    pub fn new(repo: Arc<dyn SyncConfigRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn list(&self) -> Result<Vec<SyncConfig>> {
        self.repo.list().await
    }

    pub async fn get(&self, entity_type: EntityType) -> Result<SyncConfig> {
        self.repo.get(entity_type).await
    }

    /// Apply an operator edit.
    ///
    /// Invalid tunables are rejected with `ConfigError` before anything is
    /// written, so they never reach the scheduler.
    #[instrument(skip(self, patch), fields(entity_type = %entity_type))]
    pub async fn update(&self, entity_type: EntityType, patch: SyncConfigPatch) -> Result<SyncConfig> {
        patch.validate()?;
        let updated = self.repo.update(entity_type, &patch, self.clock.now()).await?;

        info!(
            sync_enabled = updated.sync_enabled,
            sync_interval_minutes = updated.sync_interval_minutes,
            batch_size = updated.batch_size,
            max_retries = updated.max_retries,
            "sync config updated"
        );
        Ok(updated)
    }
}
