//! In-memory implementations of the core ports.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use erpsync_common::time::MockClock;
use erpsync_core::{
    plan_upsert, ErpGateway, ExternalRecord, LocalStore, Page, PageCursor, PageRequest,
    ReconcileStrategy, ReconcileUnit, Sleeper, StoredFingerprints, StoredHeader,
    SyncConfigRepository,
};
use erpsync_domain::constants::SYNC_STATUS_SYNCED;
use erpsync_domain::{
    EntityType, NaturalKey, ReconciliationOutcome, Result, SyncConfig, SyncConfigPatch,
    SyncError, UpsertReport,
};
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Debug, Clone)]
struct StoredLine {
    fields: Value,
    fingerprint: String,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    header: StoredHeader,
    lines: BTreeMap<i64, StoredLine>,
}

/// `LocalStore` over a mutex-guarded map. The whole unit is applied under
/// one lock acquisition, so header and lines change together.
#[derive(Default)]
pub struct InMemoryLocalStore {
    records: Mutex<HashMap<NaturalKey, StoredRecord>>,
    failing: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryLocalStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent upsert fail with `Storage`.
    pub fn fail_writes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn header_count(&self) -> usize {
        self.records.lock().len()
    }

    pub fn line_count(&self, key: &NaturalKey) -> usize {
        self.records.lock().get(key).map_or(0, |r| r.lines.len())
    }

    /// Upserts that actually wrote something.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn upsert_header_with_lines(&self, unit: ReconcileUnit) -> Result<UpsertReport> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SyncError::Storage("database is locked".into()));
        }

        let mut records = self.records.lock();
        let existing = records.get(&unit.key).map(|record| StoredFingerprints {
            header: record.header.fingerprint.clone(),
            lines: record.lines.iter().map(|(n, l)| (*n, l.fingerprint.clone())).collect(),
        });
        let plan = plan_upsert(existing.as_ref(), &unit);

        if plan.writes_anything() {
            let now = Utc::now();
            let record = records.entry(unit.key.clone()).or_insert_with(|| StoredRecord {
                header: StoredHeader {
                    key: unit.key.clone(),
                    fields: Value::Null,
                    fingerprint: String::new(),
                    sync_status: SYNC_STATUS_SYNCED.to_string(),
                    last_sync_at: now,
                    line_count: 0,
                },
                lines: BTreeMap::new(),
            });
            record.header.fields = unit.header.fields.clone();
            record.header.fingerprint = unit.header.fingerprint.clone();
            record.header.last_sync_at = now;

            for (line, outcome) in unit.lines.iter().zip(&plan.lines) {
                if *outcome != ReconciliationOutcome::Skipped {
                    record.lines.insert(
                        line.line_num,
                        StoredLine { fields: line.fields.clone(), fingerprint: line.fingerprint.clone() },
                    );
                }
            }
            record.header.line_count = record.lines.len() as u64;
            self.writes.fetch_add(1, Ordering::SeqCst);
        }

        Ok(plan.report())
    }

    async fn find_header(&self, key: &NaturalKey) -> Result<Option<StoredHeader>> {
        Ok(self.records.lock().get(key).map(|r| r.header.clone()))
    }
}

/// ERP double serving a fixed collection with offset paging.
pub struct InMemoryErp {
    entity_type: EntityType,
    records: Mutex<Vec<Value>>,
    /// Every fetch at or past this offset fails with the given error.
    fail_from: Mutex<Option<(u64, SyncError)>>,
    /// The next N page fetches fail with `Transport`.
    transient_failures: AtomicUsize,
    unreachable: AtomicBool,
    page_delay: Mutex<Option<Duration>>,
    /// Moves the clock forward on every fetch, simulating slow pages.
    clock_step: Mutex<Option<(MockClock, Duration)>>,
    page_fetches: AtomicUsize,
}

impl InMemoryErp {
    pub fn new(entity_type: EntityType, records: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            entity_type,
            records: Mutex::new(records),
            fail_from: Mutex::new(None),
            transient_failures: AtomicUsize::new(0),
            unreachable: AtomicBool::new(false),
            page_delay: Mutex::new(None),
            clock_step: Mutex::new(None),
            page_fetches: AtomicUsize::new(0),
        })
    }

    pub fn fail_from_offset(&self, offset: u64, error: SyncError) {
        *self.fail_from.lock() = Some((offset, error));
    }

    pub fn fail_next_pages(&self, count: usize) {
        self.transient_failures.store(count, Ordering::SeqCst);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn delay_pages(&self, delay: Duration) {
        *self.page_delay.lock() = Some(delay);
    }

    pub fn advance_clock_per_page(&self, clock: MockClock, step: Duration) {
        *self.clock_step.lock() = Some((clock, step));
    }

    pub fn replace(&self, index: usize, record: Value) {
        self.records.lock()[index] = record;
    }

    pub fn page_fetches(&self) -> usize {
        self.page_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ErpGateway for InMemoryErp {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page> {
        self.page_fetches.fetch_add(1, Ordering::SeqCst);

        let step = self.clock_step.lock().clone();
        if let Some((clock, step)) = step {
            clock.advance(step);
        }
        let delay = *self.page_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(SyncError::Transport("connection refused".into()));
        }
        if self
            .transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SyncError::Transport("502 Bad Gateway".into()));
        }
        if let Some((offset, error)) = self.fail_from.lock().clone() {
            if request.cursor.offset() >= offset {
                return Err(error);
            }
        }

        let records = self.records.lock();
        let start = (request.cursor.offset() as usize).min(records.len());
        let end = (start + request.page_size).min(records.len());
        let page: Vec<Value> = records[start..end].to_vec();
        let next_cursor =
            (page.len() == request.page_size).then(|| request.cursor.advance(page.len()));

        Ok(Page { records: page, next_cursor })
    }

    async fn fetch_one(&self, key: &NaturalKey) -> Result<ExternalRecord> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(SyncError::Transport("connection refused".into()));
        }
        let strategy = ReconcileStrategy::for_entity(self.entity_type);
        self.records
            .lock()
            .iter()
            .find(|record| strategy.natural_key_of(record).is_ok_and(|k| k == *key))
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("{key} does not exist in the ERP")))
    }
}

/// Config store seeded with one row per entity type.
pub struct InMemoryConfigRepo {
    rows: Mutex<BTreeMap<EntityType, SyncConfig>>,
}

impl InMemoryConfigRepo {
    pub fn seeded(now: DateTime<Utc>) -> Arc<Self> {
        let rows = EntityType::ALL.iter().map(|e| (*e, SyncConfig::seed(*e, now))).collect();
        Arc::new(Self { rows: Mutex::new(rows) })
    }

    /// Edit a row directly, bypassing validation.
    pub fn edit(&self, entity_type: EntityType, edit: impl FnOnce(&mut SyncConfig)) {
        if let Some(row) = self.rows.lock().get_mut(&entity_type) {
            edit(row);
        }
    }

    pub fn snapshot(&self, entity_type: EntityType) -> SyncConfig {
        self.rows.lock()[&entity_type].clone()
    }
}

#[async_trait]
impl SyncConfigRepository for InMemoryConfigRepo {
    async fn list(&self) -> Result<Vec<SyncConfig>> {
        Ok(self.rows.lock().values().cloned().collect())
    }

    async fn get(&self, entity_type: EntityType) -> Result<SyncConfig> {
        self.rows
            .lock()
            .get(&entity_type)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("no sync config for {entity_type}")))
    }

    async fn update(
        &self,
        entity_type: EntityType,
        patch: &SyncConfigPatch,
        now: DateTime<Utc>,
    ) -> Result<SyncConfig> {
        let mut rows = self.rows.lock();
        let row = rows
            .get_mut(&entity_type)
            .ok_or_else(|| SyncError::NotFound(format!("no sync config for {entity_type}")))?;
        row.apply(patch, now)?;
        Ok(row.clone())
    }

    async fn record_run(&self, entity_type: EntityType, now: DateTime<Utc>) -> Result<SyncConfig> {
        let mut rows = self.rows.lock();
        let row = rows
            .get_mut(&entity_type)
            .ok_or_else(|| SyncError::NotFound(format!("no sync config for {entity_type}")))?;
        row.record_run(now);
        Ok(row.clone())
    }
}

/// Records requested delays and returns immediately.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.delays.lock().push(duration);
    }
}
