//! Configuration loader
//!
//! Loads application configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the required ones are missing, falls back to a config file
//! 3. If no file is found either, the built-in defaults apply
//!
//! ## Environment Variables
//! - `ERPSYNC_DB_PATH` (required): SQLite file path
//! - `ERPSYNC_ERP_URL` (required): ERP gateway base URL
//! - `ERPSYNC_DB_POOL_SIZE`: Connection pool size
//! - `ERPSYNC_ERP_USERNAME` / `ERPSYNC_ERP_PASSWORD`: ERP login
//! - `ERPSYNC_ERP_TIMEOUT`: Per-request timeout in seconds
//! - `ERPSYNC_TICK_SECONDS`: Scheduler tick interval
//! - `ERPSYNC_PAGE_TIMEOUT`: Page fetch+reconcile timeout in seconds
//! - `ERPSYNC_SCHEDULER_ENABLED`: Whether the background scheduler runs
//! - `ERPSYNC_BIND_ADDR`: HTTP listen address
//!
//! ## File Locations
//! `./config.{json,toml}`, `./erpsync.{json,toml}`, the two parent
//! directories, then the same names next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use erpsync_domain::{Config, Result, SyncError};

const CONFIG_FILE_NAMES: [&str; 4] = ["config.json", "config.toml", "erpsync.json", "erpsync.toml"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `SyncError::Config` when an env var or the found file holds an
/// invalid value. A missing file is not an error.
pub fn load() -> Result<Config> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = %e, "Environment incomplete, trying config file");
            match probe_config_paths() {
                Some(path) => load_from_file(Some(path)),
                None => {
                    tracing::warn!("No config file found; using built-in defaults");
                    Ok(Config::default())
                }
            }
        }
    }
}

/// Load configuration from environment variables
///
/// `ERPSYNC_DB_PATH` and `ERPSYNC_ERP_URL` must be set; every other value
/// falls back to its default.
///
/// # Errors
/// Returns `SyncError::Config` if a required variable is missing or any
/// variable has an invalid value.
pub fn load_from_env() -> Result<Config> {
    let mut config = Config::default();

    config.database.path = env_var("ERPSYNC_DB_PATH")?;
    config.erp.base_url = env_var("ERPSYNC_ERP_URL")?;

    if let Some(pool_size) = env_parse("ERPSYNC_DB_POOL_SIZE")? {
        config.database.pool_size = pool_size;
    }
    if let Ok(username) = std::env::var("ERPSYNC_ERP_USERNAME") {
        config.erp.username = username;
    }
    if let Ok(password) = std::env::var("ERPSYNC_ERP_PASSWORD") {
        config.erp.password = password;
    }
    if let Some(timeout) = env_parse("ERPSYNC_ERP_TIMEOUT")? {
        config.erp.timeout_seconds = timeout;
    }
    if let Some(tick) = env_parse("ERPSYNC_TICK_SECONDS")? {
        config.scheduler.tick_seconds = tick;
    }
    if let Some(page_timeout) = env_parse("ERPSYNC_PAGE_TIMEOUT")? {
        config.scheduler.page_timeout_seconds = page_timeout;
    }
    config.scheduler.enabled = env_bool("ERPSYNC_SCHEDULER_ENABLED", config.scheduler.enabled);
    if let Ok(bind_addr) = std::env::var("ERPSYNC_BIND_ADDR") {
        config.server.bind_addr = bind_addr;
    }

    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Format is chosen by
/// extension (`.json` or `.toml`).
///
/// # Errors
/// Returns `SyncError::Config` if the file is missing, unreadable or
/// invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(SyncError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            SyncError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| SyncError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| SyncError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| SyncError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(SyncError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.extend([cwd.clone(), cwd.join(".."), cwd.join("../..")]);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        roots.push(exe_dir);
    }

    roots
        .iter()
        .flat_map(|root| CONFIG_FILE_NAMES.iter().map(move |name| root.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| SyncError::Config(format!("Missing required environment variable: {key}")))
}

/// Parse an optional numeric variable; unset yields `None`.
fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| SyncError::Config(format!("Invalid value for {key}: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
