//! SQLite implementation of the `LocalStore` port
//!
//! One reconciliation unit (header plus lines) is applied inside a single
//! `BEGIN IMMEDIATE` transaction, and upserts of the same natural key are
//! serialized in-process by a per-key async mutex.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use erpsync_common::time::{Clock, SystemClock};
use erpsync_core::{plan_upsert, LocalStore, ReconcileUnit, StoredFingerprints, StoredHeader};
use erpsync_domain::constants::SYNC_STATUS_SYNCED;
use erpsync_domain::{
    EntityType, NaturalKey, ReconciliationOutcome, Result, SyncError, UpsertReport,
};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tokio::sync::Mutex;
use tokio::task;
use tracing::debug;

use super::manager::DbManager;
use super::{from_millis, map_join_error, map_sql_error, to_millis};
use crate::errors::InfraError;

/// Header and line table of one entity type.
#[derive(Debug, Clone, Copy)]
struct Tables {
    header: &'static str,
    lines: Option<&'static str>,
}

const fn tables(entity_type: EntityType) -> Tables {
    match entity_type {
        EntityType::Items => Tables { header: "products", lines: None },
        EntityType::Dispatches => Tables { header: "dispatches", lines: Some("dispatch_lines") },
        EntityType::GoodsReceipts => {
            Tables { header: "goods_receipts", lines: Some("goods_receipt_lines") }
        }
        EntityType::ProcurementOrders => {
            Tables { header: "procurement_orders", lines: Some("procurement_order_lines") }
        }
    }
}

pub struct SqliteLocalStore {
    db: Arc<DbManager>,
    key_locks: DashMap<String, Arc<Mutex<()>>>,
    clock: Arc<dyn Clock>,
}

impl SqliteLocalStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self::with_clock(db, Arc::new(SystemClock))
    }

    pub fn with_clock(db: Arc<DbManager>, clock: Arc<dyn Clock>) -> Self {
        Self { db, key_locks: DashMap::new(), clock }
    }

    /// Number of stored lines owned by `key`.
    pub async fn count_lines(&self, key: &NaturalKey) -> Result<u64> {
        let Some(lines_table) = tables(key.entity_type).lines else {
            return Ok(0);
        };
        let db = Arc::clone(&self.db);
        let key = key.to_string();

        task::spawn_blocking(move || -> Result<u64> {
            let conn = db.get_connection()?;
            count_lines(&conn, lines_table, &key)
        })
        .await
        .map_err(map_join_error)?
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        Arc::clone(self.key_locks.entry(key.to_string()).or_default().value())
    }

    /// Drop the lock entry once nobody else holds it.
    fn release_key_lock(&self, key: &str) {
        self.key_locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn upsert_header_with_lines(&self, unit: ReconcileUnit) -> Result<UpsertReport> {
        let key = unit.key.to_string();
        let lock = self.key_lock(&key);

        let result = {
            let _guard = lock.lock().await;
            let db = Arc::clone(&self.db);
            let now = to_millis(self.clock.now());

            match task::spawn_blocking(move || -> Result<UpsertReport> {
                let mut conn = db.get_connection()?;
                apply_unit(&mut conn, &unit, now)
            })
            .await
            {
                Ok(applied) => applied,
                Err(err) => Err(map_join_error(err)),
            }
        };

        drop(lock);
        self.release_key_lock(&key);

        if let Ok(report) = &result {
            debug!(key = %key, outcome = %report.outcome, "unit applied");
        }
        result
    }

    async fn find_header(&self, key: &NaturalKey) -> Result<Option<StoredHeader>> {
        let db = Arc::clone(&self.db);
        let key = key.clone();

        task::spawn_blocking(move || -> Result<Option<StoredHeader>> {
            let conn = db.get_connection()?;
            query_header(&conn, &key)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn apply_unit(conn: &mut Connection, unit: &ReconcileUnit, now: i64) -> Result<UpsertReport> {
    let tables = tables(unit.key.entity_type);
    let key = unit.key.to_string();

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate).map_err(map_sql_error)?;

    let existing = load_fingerprints(&tx, tables, &key)?;
    let plan = plan_upsert(existing.as_ref(), unit);

    if plan.writes_anything() {
        let fields = unit.header.fields.to_string();
        tx.execute(
            &format!(
                "INSERT INTO {} (natural_key, fields, fingerprint, sync_status, last_sync_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5, ?5)
                 ON CONFLICT(natural_key) DO UPDATE SET
                    fields = excluded.fields,
                    fingerprint = excluded.fingerprint,
                    sync_status = excluded.sync_status,
                    last_sync_at = excluded.last_sync_at,
                    updated_at = excluded.updated_at",
                tables.header
            ),
            params![key, fields, unit.header.fingerprint, SYNC_STATUS_SYNCED, now],
        )
        .map_err(map_sql_error)?;

        if let Some(lines_table) = tables.lines {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {lines_table} (header_key, line_num, fields, fingerprint, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(header_key, line_num) DO UPDATE SET
                        fields = excluded.fields,
                        fingerprint = excluded.fingerprint,
                        updated_at = excluded.updated_at"
                ))
                .map_err(map_sql_error)?;

            for (line, outcome) in unit.lines.iter().zip(&plan.lines) {
                if *outcome == ReconciliationOutcome::Skipped {
                    continue;
                }
                stmt.execute(params![
                    key,
                    line.line_num,
                    line.fields.to_string(),
                    line.fingerprint,
                    now
                ])
                .map_err(map_sql_error)?;
            }
        }
    }

    tx.commit().map_err(map_sql_error)?;
    Ok(plan.report())
}

fn load_fingerprints(conn: &Connection, tables: Tables, key: &str) -> Result<Option<StoredFingerprints>> {
    let header: Option<String> = conn
        .query_row(
            &format!("SELECT fingerprint FROM {} WHERE natural_key = ?1", tables.header),
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_sql_error)?;

    let Some(header) = header else {
        return Ok(None);
    };

    let mut lines = HashMap::new();
    if let Some(lines_table) = tables.lines {
        let mut stmt = conn
            .prepare(&format!(
                "SELECT line_num, fingerprint FROM {lines_table} WHERE header_key = ?1"
            ))
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map(params![key], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .map_err(map_sql_error)?;
        for row in rows {
            let (line_num, fingerprint) = row.map_err(map_sql_error)?;
            lines.insert(line_num, fingerprint);
        }
    }

    Ok(Some(StoredFingerprints { header, lines }))
}

fn query_header(conn: &Connection, key: &NaturalKey) -> Result<Option<StoredHeader>> {
    let tables = tables(key.entity_type);
    let key_text = key.to_string();

    let row = conn
        .query_row(
            &format!(
                "SELECT fields, fingerprint, sync_status, last_sync_at FROM {} WHERE natural_key = ?1",
                tables.header
            ),
            params![key_text],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            },
        )
        .optional()
        .map_err(map_sql_error)?;

    let Some((fields, fingerprint, sync_status, last_sync_at)) = row else {
        return Ok(None);
    };

    let line_count = match tables.lines {
        Some(lines_table) => count_lines(conn, lines_table, &key_text)?,
        None => 0,
    };
    let fields = serde_json::from_str(&fields).map_err(|err| SyncError::from(InfraError::from(err)))?;

    Ok(Some(StoredHeader {
        key: key.clone(),
        fields,
        fingerprint,
        sync_status,
        last_sync_at: from_millis(last_sync_at)?,
        line_count,
    }))
}

fn count_lines(conn: &Connection, lines_table: &str, key: &str) -> Result<u64> {
    let count: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM {lines_table} WHERE header_key = ?1"),
            params![key],
            |row| row.get(0),
        )
        .map_err(map_sql_error)?;
    Ok(count.max(0) as u64)
}
