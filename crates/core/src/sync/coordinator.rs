//! Lease-guarded sync cycle
//!
//! Glues the pure [`tick`] decision, the [`RunLeases`] and
//! [`EntitySyncer::sync_entity`] together with the config bookkeeping. The
//! timer and task spawning live in the infrastructure runtime; everything
//! here is driven by an injected [`Clock`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use erpsync_common::time::Clock;
use erpsync_domain::{EntityType, Result, SyncRun};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use super::ports::SyncConfigRepository;
use super::runner::EntitySyncer;
use crate::scheduler::{tick, LeaseGuard, RunLeases, SchedulerState};

/// Per-entity line of [`SyncCoordinator::status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityStatus {
    pub entity_type: EntityType,
    pub sync_enabled: bool,
    pub next_sync_at: Option<chrono::DateTime<chrono::Utc>>,
    pub in_flight: bool,
    pub last_run: Option<SyncRun>,
}

pub struct SyncCoordinator {
    configs: Arc<dyn SyncConfigRepository>,
    syncer: Arc<EntitySyncer>,
    leases: Arc<RunLeases>,
    clock: Arc<dyn Clock>,
    last_runs: Mutex<HashMap<EntityType, SyncRun>>,
}

impl SyncCoordinator {
    pub fn new(
        configs: Arc<dyn SyncConfigRepository>,
        syncer: Arc<EntitySyncer>,
        leases: Arc<RunLeases>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { configs, syncer, leases, clock, last_runs: Mutex::new(HashMap::new()) }
    }

    pub fn leases(&self) -> &Arc<RunLeases> {
        &self.leases
    }

    /// Decide which entities start now and take their leases.
    ///
    /// Configs are re-read on every call so operator edits apply within one
    /// tick. An entity whose lease cannot be taken is skipped, never queued.
    pub async fn due_now(&self) -> Result<Vec<LeaseGuard>> {
        let now = self.clock.now();
        let configs = self.configs.list().await?;
        let in_flight: HashSet<EntityType> = self.leases.held(now).into_iter().collect();

        let (_, to_start) = tick(SchedulerState::from_configs(&configs, &in_flight), now);

        let mut guards = Vec::with_capacity(to_start.len());
        for entity_type in to_start {
            match self.leases.try_acquire(entity_type, now) {
                Some(guard) => guards.push(guard),
                None => debug!(entity_type = %entity_type, "lease taken since tick, skipping"),
            }
        }
        Ok(guards)
    }

    /// Run the entity owned by `lease`, then record the run on its config.
    ///
    /// `last_sync_at`/`next_sync_at` are written whatever the terminal
    /// status, so a failing entity retries on its normal cadence. The lease
    /// is renewed before every page attempt and released when this returns.
    #[instrument(skip(self, lease), fields(entity_type = %lease.entity_type()))]
    pub async fn run_leased(&self, lease: LeaseGuard) -> Result<SyncRun> {
        let entity_type = lease.entity_type();
        let config = self.configs.get(entity_type).await?;

        let run = self.syncer.sync_entity_leased(&config, &lease).await;

        let finished_at = run.finished_at.unwrap_or_else(|| self.clock.now());
        match self.configs.record_run(entity_type, finished_at).await {
            Ok(updated) => info!(
                next_sync_at = ?updated.next_sync_at,
                status = %run.status,
                "sync bookkeeping recorded"
            ),
            Err(err) => error!(error = %err, "failed to record sync run on config"),
        }

        self.last_runs.lock().insert(entity_type, run.clone());
        drop(lease);
        Ok(run)
    }

    /// Run `entity_type` immediately through the same lease.
    ///
    /// Returns `Ok(None)` when a run for that entity is already in flight.
    pub async fn run_now(&self, entity_type: EntityType) -> Result<Option<SyncRun>> {
        let Some(lease) = self.leases.try_acquire(entity_type, self.clock.now()) else {
            return Ok(None);
        };
        self.run_leased(lease).await.map(Some)
    }

    pub fn last_run(&self, entity_type: EntityType) -> Option<SyncRun> {
        self.last_runs.lock().get(&entity_type).cloned()
    }

    /// Config, lease and last-run view of every entity.
    pub async fn status(&self) -> Result<Vec<EntityStatus>> {
        let now = self.clock.now();
        let configs = self.configs.list().await?;
        let last_runs = self.last_runs.lock().clone();

        Ok(configs
            .into_iter()
            .map(|config| EntityStatus {
                entity_type: config.entity_type,
                sync_enabled: config.sync_enabled,
                next_sync_at: config.next_sync_at,
                in_flight: self.leases.is_held(config.entity_type, now),
                last_run: last_runs.get(&config.entity_type).cloned(),
            })
            .collect())
    }
}
