//! Synchronization use cases
//!
//! - [`ports`]: traits the infrastructure implements
//! - [`runner`]: the per-entity paging loop with page-level retry
//! - [`manual`]: on-demand single-document reconciliation
//! - [`config_service`]: validated reads and edits of sync configuration
//! - [`coordinator`]: lease-guarded runs and their config bookkeeping

pub mod config_service;
pub mod coordinator;
pub mod manual;
pub mod ports;
pub mod runner;
