//! Background scheduling
//!
//! The scheduler owns one interval loop. Each tick asks the coordinator which
//! entities are due, and each due entity runs on its own task under its lease.
//! Lifecycle follows the usual rules: explicit start/stop, a join handle for
//! the loop, a cancellation token and a bounded join on shutdown.

pub mod entity_scheduler;
pub mod error;

pub use entity_scheduler::{EntitySyncScheduler, SchedulerConfig};
pub use error::{SchedulerError, SchedulerResult};
