//! Engine constants
//!
//! Defaults shared by the scheduler, the config store and the ERP adapter.

// Sync config seed defaults
pub const DEFAULT_SYNC_INTERVAL_MINUTES: i64 = 60;
pub const DEFAULT_BATCH_SIZE: i64 = 100;
pub const DEFAULT_MAX_RETRIES: i64 = 3;

// Scheduler runtime
pub const DEFAULT_TICK_SECONDS: u64 = 30;
pub const DEFAULT_PAGE_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_LEASE_TTL_SECONDS: u64 = 900;
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 60_000;

// Header sync_status written by the reconciler
pub const SYNC_STATUS_SYNCED: &str = "SYNCED";

// ERP adapter
pub const DEFAULT_ERP_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_ERP_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
