//! # ErpSync Core
//!
//! Pure orchestration logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces for the ERP gateway, the local store and the config
//!   store (traits)
//! - The reconciler and its per-entity strategies
//! - The scheduling decision (`tick`) and per-entity run leases
//! - The paging loop, manual single-document sync and config service
//!
//! ## Architecture Principles
//! - Only depends on `erpsync-domain` and `erpsync-common`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod reconcile;
pub mod scheduler;
pub mod sync;

pub use reconcile::{
    plan_upsert, MappedHeader, MappedLine, PageOutcome, ReconcileStrategy, ReconcileUnit, Reconciler,
    StoredFingerprints, UpsertPlan,
};
pub use scheduler::{tick, LeaseGuard, RunLeases, ScheduleEntry, SchedulerState};
pub use sync::config_service::SyncConfigService;
pub use sync::coordinator::{EntityStatus, SyncCoordinator};
pub use sync::manual::{ManualSyncResult, ManualSyncService, ManualSyncStats};
pub use sync::ports::{
    ErpGateway, ExternalRecord, LocalStore, Page, PageCursor, PageRequest, StoredHeader,
    SyncConfigRepository,
};
pub use sync::runner::{EntitySyncer, Sleeper, TokioSleeper};
