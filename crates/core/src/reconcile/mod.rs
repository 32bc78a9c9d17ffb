//! Reconciliation of external records into the local store
//!
//! One [`Reconciler`] core drives every entity type. The entity-specific
//! parts (natural key, field mapping, fingerprints) live in
//! [`ReconcileStrategy`]; the insert/update/skip decision is the pure
//! [`plan_upsert`], which stores evaluate inside their write transaction.

pub mod fingerprint;
pub mod plan;
pub mod reconciler;
pub mod strategy;

pub use fingerprint::fingerprint;
pub use plan::{plan_upsert, StoredFingerprints, UpsertPlan};
pub use reconciler::{PageOutcome, Reconciler};
pub use strategy::{MappedHeader, MappedLine, ReconcileStrategy, ReconcileUnit};
