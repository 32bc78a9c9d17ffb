//! Port interfaces for synchronization

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use erpsync_domain::{
    EntityType, NaturalKey, Result, SyncConfig, SyncConfigPatch, UpsertReport,
};
use serde::{Deserialize, Serialize};

use crate::reconcile::ReconcileUnit;

/// Raw record as returned by the ERP, decoded per entity by the reconciler.
pub type ExternalRecord = serde_json::Value;

/// Offset cursor into an ERP collection.
///
/// Re-fetching the same cursor returns the same page, so a retried page is
/// idempotent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageCursor(pub u64);

impl PageCursor {
    pub const fn start() -> Self {
        Self(0)
    }

    pub const fn offset(&self) -> u64 {
        self.0
    }

    /// Cursor just past a page of `len` records.
    pub fn advance(&self, len: usize) -> Self {
        Self(self.0.saturating_add(len as u64))
    }
}

/// One paged fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub entity_type: EntityType,
    pub endpoint: String,
    pub cursor: PageCursor,
    pub page_size: usize,
}

/// A page of records; `next_cursor == None` means no more pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<ExternalRecord>,
    pub next_cursor: Option<PageCursor>,
}

/// External ERP system.
///
/// Implementations must report a missing document as `SyncError::NotFound`,
/// an unreachable or failing ERP as `SyncError::Transport` and throttling as
/// `SyncError::RateLimited`.
#[async_trait]
pub trait ErpGateway: Send + Sync {
    /// Fetch one page of an entity collection.
    async fn fetch_page(&self, request: &PageRequest) -> Result<Page>;

    /// Fetch exactly one document by natural key.
    async fn fetch_one(&self, key: &NaturalKey) -> Result<ExternalRecord>;
}

/// Header as currently stored locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredHeader {
    pub key: NaturalKey,
    pub fields: serde_json::Value,
    pub fingerprint: String,
    pub sync_status: String,
    pub last_sync_at: DateTime<Utc>,
    pub line_count: u64,
}

/// Local mirror of ERP records.
///
/// The reconciler is the only writer. Implementations must apply one
/// [`ReconcileUnit`] atomically (header and lines together) and serialize
/// concurrent upserts of the same key.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Compare against stored fingerprints and apply the minimal write.
    async fn upsert_header_with_lines(&self, unit: ReconcileUnit) -> Result<UpsertReport>;

    /// Look up a header by natural key.
    async fn find_header(&self, key: &NaturalKey) -> Result<Option<StoredHeader>>;
}

/// Persistent per-entity sync configuration.
#[async_trait]
pub trait SyncConfigRepository: Send + Sync {
    /// All config rows, in entity order.
    async fn list(&self) -> Result<Vec<SyncConfig>>;

    /// One config row; `SyncError::NotFound` if it was never seeded.
    async fn get(&self, entity_type: EntityType) -> Result<SyncConfig>;

    /// Apply an already validated patch and return the updated row.
    async fn update(
        &self,
        entity_type: EntityType,
        patch: &SyncConfigPatch,
        now: DateTime<Utc>,
    ) -> Result<SyncConfig>;

    /// Set `last_sync_at = now` and `next_sync_at = now + interval`.
    async fn record_run(&self, entity_type: EntityType, now: DateTime<Utc>) -> Result<SyncConfig>;
}
