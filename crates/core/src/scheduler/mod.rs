//! Scheduling decision and run exclusion
//!
//! [`tick`] is a pure function over [`SchedulerState`]; launching the runs it
//! selects is left to the runtime in `erpsync-infra`. [`RunLeases`] provides
//! the one-run-per-entity exclusion with reclaimable, expiring leases.

pub mod decision;
pub mod lease;

pub use decision::{tick, ScheduleEntry, SchedulerState};
pub use lease::{LeaseGuard, RunLeases};
