//! Application configuration structures
//!
//! Loaded by `erpsync_infra::config::loader` from environment variables or a
//! JSON/TOML file. Every section has defaults so a file only needs to name
//! what it changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKOFF_BASE_MS, DEFAULT_BACKOFF_MAX_MS, DEFAULT_BIND_ADDR, DEFAULT_ERP_MAX_ATTEMPTS,
    DEFAULT_ERP_TIMEOUT_SECONDS, DEFAULT_LEASE_TTL_SECONDS, DEFAULT_PAGE_TIMEOUT_SECONDS,
    DEFAULT_TICK_SECONDS,
};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub erp: ErpConfig,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Local store location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "erpsync.db".to_string(), pool_size: 8 }
    }
}

/// ERP gateway connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErpConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
    /// Attempts per HTTP call (initial try included).
    pub max_attempts: usize,
}

impl ErpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }
}

impl Default for ErpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:49568".to_string(),
            username: String::new(),
            password: String::new(),
            timeout_seconds: DEFAULT_ERP_TIMEOUT_SECONDS,
            max_attempts: DEFAULT_ERP_MAX_ATTEMPTS,
        }
    }
}

// Password stays out of logs.
impl std::fmt::Debug for ErpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErpConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

/// Scheduler runtime tunables (the per-entity cadence lives in `SyncConfig`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub enabled: bool,
    pub tick_seconds: u64,
    pub page_timeout_seconds: u64,
    pub lease_ttl_seconds: u64,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl SchedulerSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_seconds.max(1))
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_seconds.max(1))
    }

    /// Lease TTL, never shorter than two page timeouts. Runs renew before
    /// each page attempt, so one attempt must fit inside the TTL.
    pub fn lease_ttl(&self) -> Duration {
        let floor = self.page_timeout().saturating_mul(2);
        Duration::from_secs(self.lease_ttl_seconds.max(1)).max(floor)
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_seconds: DEFAULT_TICK_SECONDS,
            page_timeout_seconds: DEFAULT_PAGE_TIMEOUT_SECONDS,
            lease_ttl_seconds: DEFAULT_LEASE_TTL_SECONDS,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
        }
    }
}

/// HTTP console surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: DEFAULT_BIND_ADDR.to_string() }
    }
}
