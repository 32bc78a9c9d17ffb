//! SQLite implementation of the `SyncConfigRepository` port

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use erpsync_core::SyncConfigRepository;
use erpsync_domain::{EntityType, Result, SyncConfig, SyncConfigPatch, SyncError};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use tokio::task;

use super::manager::DbManager;
use super::{from_millis, map_join_error, map_sql_error, to_millis};

const SELECT_COLUMNS: &str = "entity_type, sync_enabled, sync_interval_minutes, batch_size, \
     max_retries, api_endpoint, last_sync_at, next_sync_at, created_at, updated_at";

pub struct SqliteSyncConfigRepository {
    db: Arc<DbManager>,
}

impl SqliteSyncConfigRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Read-modify-write one row inside an immediate transaction.
    async fn modify<F>(&self, entity_type: EntityType, modify: F) -> Result<SyncConfig>
    where
        F: FnOnce(&mut SyncConfig) -> Result<()> + Send + 'static,
    {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<SyncConfig> {
            let mut conn = db.get_connection()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_sql_error)?;

            let mut config = query_config(&tx, entity_type)?
                .ok_or_else(|| not_seeded(entity_type))?;
            modify(&mut config)?;
            write_config(&tx, &config)?;

            tx.commit().map_err(map_sql_error)?;
            Ok(config)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl SyncConfigRepository for SqliteSyncConfigRepository {
    async fn list(&self) -> Result<Vec<SyncConfig>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<SyncConfig>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(&format!("SELECT {SELECT_COLUMNS} FROM sync_config"))
                .map_err(map_sql_error)?;
            let rows = stmt.query_map([], map_row).map_err(map_sql_error)?;

            let mut configs = Vec::new();
            for row in rows {
                configs.push(row.map_err(map_sql_error)?.into_config()?);
            }
            configs.sort_by_key(|c| c.entity_type);
            Ok(configs)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, entity_type: EntityType) -> Result<SyncConfig> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<SyncConfig> {
            let conn = db.get_connection()?;
            query_config(&conn, entity_type)?.ok_or_else(|| not_seeded(entity_type))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update(
        &self,
        entity_type: EntityType,
        patch: &SyncConfigPatch,
        now: DateTime<Utc>,
    ) -> Result<SyncConfig> {
        let patch = patch.clone();
        self.modify(entity_type, move |config| config.apply(&patch, now)).await
    }

    async fn record_run(&self, entity_type: EntityType, now: DateTime<Utc>) -> Result<SyncConfig> {
        self.modify(entity_type, move |config| {
            config.record_run(now);
            Ok(())
        })
        .await
    }
}

fn not_seeded(entity_type: EntityType) -> SyncError {
    SyncError::NotFound(format!("no sync config row for {entity_type}"))
}

/// Raw column values; conversion errors surface after the row closure.
struct ConfigRow {
    entity_type: String,
    sync_enabled: bool,
    sync_interval_minutes: i64,
    batch_size: i64,
    max_retries: i64,
    api_endpoint: String,
    last_sync_at: Option<i64>,
    next_sync_at: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl ConfigRow {
    fn into_config(self) -> Result<SyncConfig> {
        let entity_type = EntityType::from_str(&self.entity_type)
            .map_err(|err| SyncError::Storage(format!("sync_config row: {err}")))?;

        Ok(SyncConfig {
            entity_type,
            sync_enabled: self.sync_enabled,
            sync_interval_minutes: self.sync_interval_minutes,
            batch_size: self.batch_size,
            max_retries: self.max_retries,
            api_endpoint: self.api_endpoint,
            last_sync_at: self.last_sync_at.map(from_millis).transpose()?,
            next_sync_at: self.next_sync_at.map(from_millis).transpose()?,
            created_at: from_millis(self.created_at)?,
            updated_at: from_millis(self.updated_at)?,
        })
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<ConfigRow> {
    Ok(ConfigRow {
        entity_type: row.get(0)?,
        sync_enabled: row.get(1)?,
        sync_interval_minutes: row.get(2)?,
        batch_size: row.get(3)?,
        max_retries: row.get(4)?,
        api_endpoint: row.get(5)?,
        last_sync_at: row.get(6)?,
        next_sync_at: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn query_config(conn: &Connection, entity_type: EntityType) -> Result<Option<SyncConfig>> {
    conn.query_row(
        &format!("SELECT {SELECT_COLUMNS} FROM sync_config WHERE entity_type = ?1"),
        params![entity_type.as_str()],
        map_row,
    )
    .optional()
    .map_err(map_sql_error)?
    .map(ConfigRow::into_config)
    .transpose()
}

fn write_config(conn: &Connection, config: &SyncConfig) -> Result<()> {
    conn.execute(
        "UPDATE sync_config SET
            sync_enabled = ?2,
            sync_interval_minutes = ?3,
            batch_size = ?4,
            max_retries = ?5,
            api_endpoint = ?6,
            last_sync_at = ?7,
            next_sync_at = ?8,
            updated_at = ?9
         WHERE entity_type = ?1",
        params![
            config.entity_type.as_str(),
            config.sync_enabled,
            config.sync_interval_minutes,
            config.batch_size,
            config.max_retries,
            config.api_endpoint,
            config.last_sync_at.map(to_millis),
            config.next_sync_at.map(to_millis),
            to_millis(config.updated_at),
        ],
    )
    .map_err(map_sql_error)?;
    Ok(())
}
