//! Domain types and models

pub mod dispatch_type;
pub mod entity;
pub mod reconcile;
pub mod records;
pub mod sync_config;
pub mod sync_run;

pub use dispatch_type::DispatchType;
pub use entity::EntityType;
pub use reconcile::{NaturalKey, ReconcileStats, ReconciliationOutcome, UpsertReport};
pub use records::{
    DispatchLineRecord, DispatchRecord, GoodsReceiptLineRecord, GoodsReceiptRecord, ItemRecord,
    ProcurementOrderRecord,
};
pub use sync_config::{SyncConfig, SyncConfigPatch};
pub use sync_run::{RunStatus, SyncRun};
