//! # ErpSync Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - SQLite persistence for the local mirror and the sync configuration
//! - The ERP gateway HTTP adapter and its retrying client
//! - The background scheduler that drives scheduled runs
//! - Configuration loading from environment and files
//!
//! ## Architecture
//! - Implements traits defined in `erpsync-core`
//! - Contains all "impure" code (I/O, clocks, network)

pub mod config;
pub mod database;
pub mod erp;
pub mod errors;
pub mod http;
pub mod scheduling;

// Re-export commonly used items
pub use database::{DbManager, SqliteLocalStore, SqliteSyncConfigRepository};
pub use erp::ErpClient;
pub use errors::InfraError;
pub use http::HttpClient;
pub use scheduling::{EntitySyncScheduler, SchedulerConfig};
