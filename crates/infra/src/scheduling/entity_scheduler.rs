//! Interval scheduler driving per-entity sync runs.
//!
//! Every tick asks [`SyncCoordinator::due_now`] for the entities whose
//! `next_sync_at` has passed. The coordinator hands back a lease per entity,
//! and each leased run is spawned on its own task so a slow entity never
//! delays the others or the next tick.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use erpsync_core::SyncCoordinator;
//! use erpsync_infra::scheduling::{EntitySyncScheduler, SchedulerConfig};
//!
//! # async fn example(coordinator: Arc<SyncCoordinator>) -> Result<(), Box<dyn std::error::Error>> {
//! let mut scheduler = EntitySyncScheduler::new(
//!     coordinator,
//!     SchedulerConfig { tick_interval: Duration::from_secs(30), ..Default::default() },
//! );
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use erpsync_core::{LeaseGuard, SyncCoordinator};
use erpsync_domain::SyncRun;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::scheduling::error::{SchedulerError, SchedulerResult};

type TaskHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Configuration for the entity scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between two due-checks
    pub tick_interval: Duration,
    /// How long `stop` waits for the loop to wind down
    pub join_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { tick_interval: Duration::from_secs(30), join_timeout: Duration::from_secs(5) }
    }
}

pub struct EntitySyncScheduler {
    coordinator: Arc<SyncCoordinator>,
    config: SchedulerConfig,
    cancellation_token: CancellationToken,
    task_handle: TaskHandle,
}

impl EntitySyncScheduler {
    pub fn new(coordinator: Arc<SyncCoordinator>, config: SchedulerConfig) -> Self {
        Self {
            coordinator,
            config,
            cancellation_token: CancellationToken::new(),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// Spawn the tick loop.
    ///
    /// # Errors
    ///
    /// Returns error if the scheduler is already running
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        info!(tick_secs = self.config.tick_interval.as_secs_f64(), "Starting entity sync scheduler");

        // fresh token so a stopped scheduler can be restarted
        self.cancellation_token = CancellationToken::new();

        let coordinator = Arc::clone(&self.coordinator);
        let tick_interval = self.config.tick_interval;
        let cancel = self.cancellation_token.clone();

        let handle = tokio::spawn(async move {
            Self::tick_loop(coordinator, tick_interval, cancel).await;
        });

        *self.task_handle.lock().await = Some(handle);
        Ok(())
    }

    /// Cancel the loop and wait for it to finish.
    ///
    /// In-flight runs are aborted; their leases are released as the tasks
    /// unwind, and a run interrupted mid-page leaves the current unit's
    /// transaction uncommitted.
    ///
    /// # Errors
    ///
    /// Returns error if the scheduler is not running or the loop does not
    /// finish within the join timeout
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        info!("Stopping entity sync scheduler");
        self.cancellation_token.cancel();

        if let Some(handle) = self.task_handle.lock().await.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!("Entity sync scheduler stopped");
        Ok(())
    }

    /// A scheduler is running while its loop task has not finished.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .try_lock()
            .ok()
            .and_then(|guard| guard.as_ref().map(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    async fn tick_loop(
        coordinator: Arc<SyncCoordinator>,
        tick_interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut runs: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(in_flight = runs.len(), "Tick loop cancelled");
                    runs.shutdown().await;
                    break;
                }
                Some(joined) = runs.join_next(), if !runs.is_empty() => {
                    if let Err(err) = joined {
                        error!(error = %err, "Sync run task panicked");
                    }
                }
                _ = ticker.tick() => {
                    match coordinator.due_now().await {
                        Ok(leases) => {
                            for lease in leases {
                                runs.spawn(Self::run_one(Arc::clone(&coordinator), lease));
                            }
                        }
                        Err(err) => warn!(error = %err, "Failed to evaluate due entities"),
                    }
                }
            }
        }
    }

    async fn run_one(coordinator: Arc<SyncCoordinator>, lease: LeaseGuard) {
        let entity_type = lease.entity_type();
        match coordinator.run_leased(lease).await {
            Ok(SyncRun { status, .. }) => debug!(%entity_type, %status, "Scheduled run finished"),
            Err(err) => error!(%entity_type, error = %err, "Scheduled run could not start"),
        }
    }
}

/// Ensure the loop is cancelled when the scheduler is dropped
impl Drop for EntitySyncScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() && self.is_running() {
            warn!("EntitySyncScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}
