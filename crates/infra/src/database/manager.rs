//! Database connection manager backed by an r2d2 SQLite pool.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use erpsync_domain::{EntityType, Result, SyncConfig, SyncError};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection};
use tracing::info;

use super::{map_sql_error, to_millis};
use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;
PRAGMA foreign_keys=ON;
PRAGMA busy_timeout=5000;";

pub type SqlitePool = Pool<SqliteConnectionManager>;
pub type SqliteConnection = PooledConnection<SqliteConnectionManager>;

/// Database manager that owns the connection pool.
pub struct DbManager {
    pool: SqlitePool,
    path: PathBuf,
}

impl DbManager {
    /// Open (or create) the database at `db_path` with up to `pool_size`
    /// connections.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path)
            .with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS));

        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .connection_timeout(Duration::from_secs(10))
            .build(manager)
            .map_err(|err| SyncError::from(InfraError::from(err)))?;

        info!(
            db_path = %path.display(),
            max_connections = pool.max_size(),
            "sqlite pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Borrow the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<SqliteConnection> {
        self.pool.get().map_err(|err| SyncError::from(InfraError::from(err)))
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        create_schema(&conn)
    }

    /// Insert the default config row for every entity type that lacks one.
    ///
    /// Existing rows are never touched, so operator edits survive restarts.
    pub fn seed_sync_configs(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.get_connection()?;
        let mut inserted = 0;

        for entity_type in EntityType::ALL {
            let seed = SyncConfig::seed(entity_type, now);
            inserted += conn
                .execute(
                    "INSERT OR IGNORE INTO sync_config (
                        entity_type, sync_enabled, sync_interval_minutes, batch_size,
                        max_retries, api_endpoint, last_sync_at, next_sync_at,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL, ?7, ?7)",
                    params![
                        seed.entity_type.as_str(),
                        seed.sync_enabled,
                        seed.sync_interval_minutes,
                        seed.batch_size,
                        seed.max_retries,
                        seed.api_endpoint,
                        to_millis(now),
                    ],
                )
                .map_err(map_sql_error)?;
        }

        if inserted > 0 {
            info!(inserted, "seeded sync config rows");
        }
        Ok(inserted)
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Verify the database is reachable and answering queries.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0)).map_err(map_sql_error)?;
        Ok(())
    }
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, ?2)",
        params![SCHEMA_VERSION, to_millis(Utc::now())],
    )
    .map_err(map_sql_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn manager(dir: &TempDir) -> DbManager {
        let manager = DbManager::new(dir.path().join("test.db"), 2).expect("manager created");
        manager.run_migrations().expect("migrations run");
        manager
    }

    #[test]
    fn migrations_create_schema_version() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager = manager(&temp_dir);

        let conn = manager.get_connection().expect("connection acquired");
        let version: i32 =
            conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0)).unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        // idempotent
        manager.run_migrations().expect("second migration run");
    }

    #[test]
    fn health_check_succeeds_for_valid_database() {
        let temp_dir = TempDir::new().expect("temp dir created");
        manager(&temp_dir).health_check().expect("health check passed");
    }

    #[test]
    fn seeding_inserts_each_entity_once() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager = manager(&temp_dir);

        assert_eq!(manager.seed_sync_configs(Utc::now()).unwrap(), 4);
        assert_eq!(manager.seed_sync_configs(Utc::now()).unwrap(), 0);

        let conn = manager.get_connection().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM sync_config", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn connections_enforce_foreign_keys() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let manager = manager(&temp_dir);
        let conn = manager.get_connection().unwrap();

        let err = conn
            .execute(
                "INSERT INTO dispatch_lines (header_key, line_num, fields, fingerprint, updated_at)
                 VALUES ('DISPATCHES:1/1', 1, '{}', 'x', 0)",
                [],
            )
            .unwrap_err();
        assert!(err.to_string().contains("FOREIGN KEY"));
    }
}
