//! Per-entity paging loop
//!
//! [`EntitySyncer::sync_entity`] pulls pages of `batch_size` records from the
//! ERP, reconciles each page and retries a failing page in place with
//! exponential backoff. It never returns an error: every outcome is folded
//! into the terminal [`RunStatus`] of the returned [`SyncRun`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use erpsync_common::resilience::{RetryDecision, RetryPolicy};
use erpsync_common::time::Clock;
use erpsync_domain::{Result, RunStatus, SyncConfig, SyncError, SyncRun};
use tracing::{debug, info, instrument, warn};

use super::ports::{ErpGateway, Page, PageCursor, PageRequest};
use crate::reconcile::{PageOutcome, Reconciler};
use crate::scheduler::LeaseGuard;

/// Suspends between page retries.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Why a page gave up.
enum PageFailure {
    /// Non-retryable error: the run is FAILED.
    Fatal(SyncError),
    /// Retry budget spent: the run is PARTIAL.
    Exhausted(SyncError),
    /// Another run took over the expired lease: the run is PARTIAL.
    LeaseLost,
}

pub struct EntitySyncer {
    gateway: Arc<dyn ErpGateway>,
    reconciler: Arc<Reconciler>,
    retry: RetryPolicy,
    page_timeout: Duration,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl EntitySyncer {
    pub fn new(
        gateway: Arc<dyn ErpGateway>,
        reconciler: Arc<Reconciler>,
        retry: RetryPolicy,
        page_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { gateway, reconciler, retry, page_timeout, sleeper: Arc::new(TokioSleeper), clock }
    }

    /// Replace the sleeper used between retries.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    /// Run one full paging pass for `config.entity_type`.
    pub async fn sync_entity(&self, config: &SyncConfig) -> SyncRun {
        self.run_pages(config, None).await
    }

    /// Like [`EntitySyncer::sync_entity`], renewing `lease` before every page
    /// attempt. The run stops as PARTIAL if the lease was reclaimed.
    pub async fn sync_entity_leased(&self, config: &SyncConfig, lease: &LeaseGuard) -> SyncRun {
        self.run_pages(config, Some(lease)).await
    }

    #[instrument(skip(self, config, lease), fields(entity_type = %config.entity_type))]
    async fn run_pages(&self, config: &SyncConfig, lease: Option<&LeaseGuard>) -> SyncRun {
        let entity_type = config.entity_type;
        // the budget is per entity, the backoff curve is process-wide
        let policy = self.retry.with_max_retries(config.retry_limit());
        let mut run = SyncRun::start(entity_type, self.clock.now());
        let mut cursor = PageCursor::start();

        info!(run_id = %run.run_id, batch_size = config.page_size(), "sync run started");

        let status = loop {
            let request = PageRequest {
                entity_type,
                endpoint: config.api_endpoint.clone(),
                cursor,
                page_size: config.page_size(),
            };

            let mut applied = PageOutcome::default();
            let result = self.process_page_with_retry(&request, &policy, lease, &mut applied).await;

            // writes committed by a failed attempt stay in the store
            run.headers.merge(&applied.headers);
            run.lines.merge(&applied.lines);
            run.malformed += applied.malformed;

            let page = match result {
                Ok(page) => page,
                Err(PageFailure::Fatal(err)) => {
                    run.last_error = Some(err.to_string());
                    break RunStatus::Failed;
                }
                Err(PageFailure::Exhausted(err)) => {
                    run.last_error = Some(err.to_string());
                    break RunStatus::Partial;
                }
                Err(PageFailure::LeaseLost) => {
                    run.last_error = Some(format!("run lease for {entity_type} was reclaimed"));
                    break RunStatus::Partial;
                }
            };

            run.pages_processed += 1;

            debug!(
                page = run.pages_processed,
                offset = cursor.offset(),
                records = page.records.len(),
                inserted = applied.headers.inserted,
                updated = applied.headers.updated,
                skipped = applied.headers.skipped,
                "page reconciled"
            );

            if page.records.is_empty() {
                break RunStatus::Completed;
            }
            match page.next_cursor {
                None => break RunStatus::Completed,
                Some(next) if next <= cursor => {
                    warn!(offset = cursor.offset(), "cursor did not advance, ending run");
                    break RunStatus::Completed;
                }
                Some(next) => cursor = next,
            }
        };

        run.finish(status, self.clock.now());
        log_run(&run);
        run
    }

    /// Retry one page in place. `applied` accumulates the header and line
    /// counts of every attempt; malformed records count once per page.
    async fn process_page_with_retry(
        &self,
        request: &PageRequest,
        policy: &RetryPolicy,
        lease: Option<&LeaseGuard>,
        applied: &mut PageOutcome,
    ) -> std::result::Result<Page, PageFailure> {
        let mut retries_done = 0;

        loop {
            if let Some(lease) = lease {
                if !lease.renew(self.clock.now()) {
                    warn!(offset = request.cursor.offset(), "run lease reclaimed, stopping run");
                    return Err(PageFailure::LeaseLost);
                }
            }

            let mut attempt = PageOutcome::default();
            let result = self.process_page(request, &mut attempt).await;
            applied.headers.merge(&attempt.headers);
            applied.lines.merge(&attempt.lines);
            applied.malformed = attempt.malformed;

            let err = match result {
                Ok(page) => return Ok(page),
                Err(err) if !err.is_retryable() => {
                    warn!(
                        offset = request.cursor.offset(),
                        error = %err,
                        kind = err.kind(),
                        "page failed, not retryable"
                    );
                    return Err(PageFailure::Fatal(err));
                }
                Err(err) => err,
            };

            match policy.decide(retries_done) {
                RetryDecision::RetryAfter(delay) => {
                    retries_done += 1;
                    warn!(
                        offset = request.cursor.offset(),
                        attempt = retries_done,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "page failed, retrying"
                    );
                    self.sleeper.sleep(delay).await;
                }
                RetryDecision::Stop => {
                    warn!(
                        offset = request.cursor.offset(),
                        retries = retries_done,
                        error = %err,
                        "page retries exhausted"
                    );
                    return Err(PageFailure::Exhausted(err));
                }
            }
        }
    }

    /// Fetch and reconcile one page under the page timeout. Records committed
    /// before a failure or timeout are already counted in `applied`.
    async fn process_page(&self, request: &PageRequest, applied: &mut PageOutcome) -> Result<Page> {
        let work = async {
            let page = self.gateway.fetch_page(request).await?;
            self.reconciler.reconcile_into(request.entity_type, &page.records, applied).await?;
            Ok::<_, SyncError>(page)
        };

        match tokio::time::timeout(self.page_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Transport(format!(
                "page at offset {} timed out after {}s",
                request.cursor.offset(),
                self.page_timeout.as_secs_f64()
            ))),
        }
    }
}

fn log_run(run: &SyncRun) {
    let entity_type = run.entity_type;
    match run.status {
        RunStatus::Completed => info!(
            run_id = %run.run_id,
            entity_type = %entity_type,
            status = %run.status,
            pages = run.pages_processed,
            headers_inserted = run.headers.inserted,
            headers_updated = run.headers.updated,
            headers_skipped = run.headers.skipped,
            lines_inserted = run.lines.inserted,
            lines_updated = run.lines.updated,
            lines_skipped = run.lines.skipped,
            malformed = run.malformed,
            duration_ms = run.duration_ms().unwrap_or_default(),
            "sync run finished"
        ),
        RunStatus::Partial | RunStatus::Failed => warn!(
            run_id = %run.run_id,
            entity_type = %entity_type,
            status = %run.status,
            pages = run.pages_processed,
            headers_inserted = run.headers.inserted,
            headers_updated = run.headers.updated,
            headers_skipped = run.headers.skipped,
            malformed = run.malformed,
            error = run.last_error.as_deref().unwrap_or_default(),
            duration_ms = run.duration_ms().unwrap_or_default(),
            "sync run finished"
        ),
    }
}
