//! # ErpSync Domain
//!
//! Business domain types for the ERP synchronization engine.
//!
//! This crate contains:
//! - Entity types, sync configuration and run summaries
//! - ERP record shapes for products, dispatches, goods receipts and
//!   procurement orders
//! - Domain error types and Result definitions
//! - Application configuration structures
//!
//! ## Architecture
//! - No dependencies on other ErpSync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
