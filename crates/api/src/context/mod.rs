//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use erpsync_common::resilience::{BackoffStrategy, RetryPolicy};
use erpsync_common::time::{Clock, SystemClock};
use erpsync_core::{
    EntitySyncer, ErpGateway, ManualSyncService, Reconciler, RunLeases, SyncConfigService,
    SyncCoordinator,
};
use erpsync_domain::constants::DEFAULT_MAX_RETRIES;
use erpsync_domain::{Config, Result, SchedulerSettings, SyncError};
use erpsync_infra::{
    DbManager, EntitySyncScheduler, ErpClient, SchedulerConfig, SqliteLocalStore,
    SqliteSyncConfigRepository,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// How long startup waits for the scheduler loop to spawn.
const SCHEDULER_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Application context - holds all services and dependencies
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub store: Arc<SqliteLocalStore>,
    pub sync_configs: SyncConfigService,
    pub coordinator: Arc<SyncCoordinator>,
    pub manual_sync: ManualSyncService,
    scheduler: Mutex<EntitySyncScheduler>,
}

impl AppContext {
    /// Open the database, wire the services against the configured ERP and
    /// start the scheduler when it is enabled.
    pub async fn new(config: Config) -> Result<Self> {
        let gateway: Arc<dyn ErpGateway> = Arc::new(ErpClient::new(&config.erp)?);
        let context = Self::with_gateway(config, gateway)?;

        if context.config.scheduler.enabled {
            context.start_scheduler().await?;
        } else {
            warn!("Background scheduler disabled by configuration");
        }
        Ok(context)
    }

    /// Wire every service over `gateway` without starting the scheduler.
    pub fn with_gateway(config: Config, gateway: Arc<dyn ErpGateway>) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;
        db.seed_sync_configs(clock.now())?;

        let store = Arc::new(SqliteLocalStore::new(Arc::clone(&db)));
        let config_repo = Arc::new(SqliteSyncConfigRepository::new(Arc::clone(&db)));
        let reconciler = Arc::new(Reconciler::new(store.clone()));

        let syncer = EntitySyncer::new(
            Arc::clone(&gateway),
            Arc::clone(&reconciler),
            page_retry_policy(&config.scheduler)?,
            config.scheduler.page_timeout(),
            Arc::clone(&clock),
        );
        let coordinator = Arc::new(SyncCoordinator::new(
            config_repo.clone(),
            Arc::new(syncer),
            RunLeases::new(config.scheduler.lease_ttl()),
            Arc::clone(&clock),
        ));
        let scheduler = EntitySyncScheduler::new(
            Arc::clone(&coordinator),
            SchedulerConfig {
                tick_interval: config.scheduler.tick_interval(),
                ..SchedulerConfig::default()
            },
        );

        info!(db_path = %config.database.path, erp = %config.erp.base_url, "Application context ready");

        Ok(Self {
            sync_configs: SyncConfigService::new(config_repo, clock),
            manual_sync: ManualSyncService::new(gateway, reconciler),
            config,
            db,
            store,
            coordinator,
            scheduler: Mutex::new(scheduler),
        })
    }

    pub async fn start_scheduler(&self) -> Result<()> {
        let mut scheduler = self.scheduler.lock().await;
        tokio::time::timeout(SCHEDULER_START_TIMEOUT, scheduler.start())
            .await
            .map_err(|_| SyncError::Internal("scheduler start timed out".into()))??;
        Ok(())
    }

    pub async fn scheduler_running(&self) -> bool {
        self.scheduler.lock().await.is_running()
    }

    /// Stop the scheduler if it runs; used on graceful shutdown.
    pub async fn shutdown(&self) {
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.is_running() {
            if let Err(err) = scheduler.stop().await {
                warn!(error = %err, "Scheduler did not stop cleanly");
            }
        }
    }
}

/// Page retry policy; the retry count itself comes from each entity's config.
fn page_retry_policy(settings: &SchedulerSettings) -> Result<RetryPolicy> {
    let backoff = BackoffStrategy::Exponential {
        initial_delay: Duration::from_millis(settings.backoff_base_ms),
        base: 2.0,
        max_delay: Duration::from_millis(settings.backoff_max_ms),
    };
    let max_retries = u32::try_from(DEFAULT_MAX_RETRIES).unwrap_or(3);
    RetryPolicy::new(max_retries, backoff).map_err(|err| SyncError::Config(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_follows_scheduler_backoff_settings() {
        let settings = SchedulerSettings { backoff_base_ms: 500, backoff_max_ms: 4_000, ..Default::default() };
        let policy = page_retry_policy(&settings).unwrap();

        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for_retry(5), Duration::from_millis(4_000));
    }

    #[test]
    fn inverted_backoff_bounds_are_rejected() {
        let settings = SchedulerSettings { backoff_base_ms: 5_000, backoff_max_ms: 10, ..Default::default() };
        assert!(matches!(page_retry_policy(&settings), Err(SyncError::Config(_))));
    }
}
