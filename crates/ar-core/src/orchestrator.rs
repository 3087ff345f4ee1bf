//! One synchronization pass, start to finish.
//!
//! The orchestrator wires the fetcher, mapper, resolver, and ledger
//! together: fetch what changed, fold in what failed last time, map, deliver
//! record by record, and persist the new failure set. Per-record failures
//! never abort the pass; only a missing status snapshot or an unwritable
//! ledger can.

use crate::fetcher::{ChangeWindowFetcher, FetchSettings};
use crate::ledger::{LedgerError, RetryLedger};
use crate::mapper::{FieldMapper, MappingProfile};
use crate::resolver::UserResolver;
use ar_connectors::traits::{
    Assignee, ConnectorError, DeviceRecord, InventoryAsset, InventoryClient, MdmClient,
};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Errors that abort a sync pass.
///
/// Everything else is contained at the record boundary and reported through
/// the [`SyncReport`].
#[derive(Debug, Error)]
pub enum SyncError {
    /// The status-label snapshot could not be fetched. Without it the usage
    /// classification would be silently wrong, so the pass stops early.
    #[error("Could not fetch status labels: {0}")]
    StatusLabels(#[source] ConnectorError),

    /// The retry ledger could not be persisted; the failure set for the next
    /// run would be silently lost.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Tuning knobs for a sync pass.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Site-specific mapping configuration.
    pub profile: MappingProfile,
    /// Inventory paging parameters.
    pub fetch: FetchSettings,
    /// Concurrent deliveries; 1 means strictly sequential.
    pub delivery_concurrency: usize,
    /// Map everything but deliver nothing and leave the ledger untouched.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            profile: MappingProfile::default(),
            fetch: FetchSettings::default(),
            delivery_concurrency: 1,
            dry_run: false,
        }
    }
}

/// Outcome of one sync pass.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    /// Start of the change window the pass covered.
    pub window_start: NaiveDateTime,
    /// Assets fetched from the change window.
    pub changed: usize,
    /// Ledgered serials re-resolved into the batch.
    pub retried: usize,
    /// Ledgered serials that no longer resolve (dropped).
    pub unresolved: usize,
    /// Unique serials mapped after last-write-wins de-duplication.
    pub mapped: usize,
    /// Records delivered to the MDM.
    pub delivered: usize,
    /// Records whose delivery failed; queued for the next run.
    pub failed: usize,
    /// Whether this pass was a dry run.
    pub dry_run: bool,
}

impl SyncReport {
    /// Whether every mapped record was delivered.
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Runs synchronization passes.
pub struct SyncOrchestrator {
    inventory: Arc<dyn InventoryClient>,
    mdm: Arc<dyn MdmClient>,
    ledger: RetryLedger,
    options: SyncOptions,
}

impl SyncOrchestrator {
    pub fn new(
        inventory: Arc<dyn InventoryClient>,
        mdm: Arc<dyn MdmClient>,
        ledger: RetryLedger,
    ) -> Self {
        Self::with_options(inventory, mdm, ledger, SyncOptions::default())
    }

    pub fn with_options(
        inventory: Arc<dyn InventoryClient>,
        mdm: Arc<dyn MdmClient>,
        ledger: RetryLedger,
        options: SyncOptions,
    ) -> Self {
        Self {
            inventory,
            mdm,
            ledger,
            options,
        }
    }

    /// Runs one pass over the window `[now - window, now]`.
    pub async fn run(
        &self,
        now: NaiveDateTime,
        window: Duration,
    ) -> Result<SyncReport, SyncError> {
        let window_start = now - window;
        info!(%window_start, "starting sync pass");

        // The snapshot everything downstream classifies against. No snapshot,
        // no pass.
        let labels = self
            .inventory
            .status_labels()
            .await
            .map_err(SyncError::StatusLabels)?;
        let mapper = FieldMapper::new(labels, self.options.profile.clone());

        let fetcher =
            ChangeWindowFetcher::new(Arc::clone(&self.inventory), self.options.fetch.clone());
        let changed = fetcher.fetch(window_start).await;
        let changed_count = changed.len();
        info!(count = changed_count, "fetched changed assets");

        let (retried, unresolved) = self.resolve_prior_failures().await;
        let retried_count = retried.len();

        // Union both lists keyed by serial; later entries overwrite earlier
        // ones, so a serial can only be delivered once per pass.
        let mut batch: HashMap<String, InventoryAsset> = HashMap::new();
        for asset in changed.into_iter().chain(retried) {
            batch.insert(asset.serial.clone(), asset);
        }
        let mapped_count = batch.len();

        let resolver = UserResolver::new(Arc::clone(&self.mdm));
        let mut records = Vec::with_capacity(batch.len());
        for (serial, asset) in batch {
            let user = match &asset.assigned_to {
                Some(Assignee::User { username, .. }) => resolver.resolve(username).await,
                _ => None,
            };
            records.push((serial, mapper.map_one(&asset, user.as_ref())));
        }

        if self.options.dry_run {
            info!(records = records.len(), "dry run; skipping delivery");
            return Ok(SyncReport {
                window_start,
                changed: changed_count,
                retried: retried_count,
                unresolved,
                mapped: mapped_count,
                delivered: 0,
                failed: 0,
                dry_run: true,
            });
        }

        let (delivered, failures) = self.deliver(records).await;
        let failed = failures.len();

        self.ledger.save(&failures)?;

        info!(delivered, failed, "sync pass complete");
        Ok(SyncReport {
            window_start,
            changed: changed_count,
            retried: retried_count,
            unresolved,
            mapped: mapped_count,
            delivered,
            failed,
            dry_run: false,
        })
    }

    /// Re-resolves the previous run's failed serials into current assets.
    ///
    /// A serial that no longer resolves is dropped from the retry cycle;
    /// the ledger's replacement semantics make that bounded-retry behavior
    /// explicit.
    async fn resolve_prior_failures(&self) -> (Vec<InventoryAsset>, usize) {
        let prior = self.ledger.load();
        if prior.is_empty() {
            return (Vec::new(), 0);
        }
        info!(count = prior.len(), "re-resolving previously failed serials");

        let mut resolved = Vec::new();
        let mut unresolved = 0;
        for serial in &prior {
            match self.inventory.find_asset(serial).await {
                Ok(asset) => resolved.push(asset),
                Err(ConnectorError::NotFound(_)) => {
                    debug!(serial = %serial, "ledgered serial no longer resolves; dropping");
                    unresolved += 1;
                }
                Err(e) => {
                    warn!(serial = %serial, error = %e, "could not re-resolve ledgered serial; dropping");
                    unresolved += 1;
                }
            }
        }
        (resolved, unresolved)
    }

    /// Delivers each record to the type-appropriate MDM endpoint.
    ///
    /// Deliveries are independent; one record's failure never blocks
    /// another's. Runs on a bounded worker pool and collects failures from
    /// the joined results, so no update is lost to concurrency.
    async fn deliver(
        &self,
        records: Vec<(String, DeviceRecord)>,
    ) -> (usize, HashSet<String>) {
        let permits = Arc::new(Semaphore::new(self.options.delivery_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (serial, record) in records {
            let mdm = Arc::clone(&self.mdm);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            serial,
                            Err(ConnectorError::Internal("delivery pool closed".into())),
                        )
                    }
                };
                let result = if record.is_mobile_device() {
                    mdm.put_mobile_device(&serial, &record).await
                } else {
                    mdm.put_computer(&serial, &record).await
                };
                (serial, result)
            });
        }

        let mut delivered = 0;
        let mut failures = HashSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((serial, Ok(()))) => {
                    debug!(serial = %serial, "delivered");
                    delivered += 1;
                }
                Ok((serial, Err(e))) => {
                    warn!(serial = %serial, error = %e, "delivery failed; queued for retry");
                    failures.insert(serial);
                }
                Err(e) => warn!(error = %e, "delivery task failed to join"),
            }
        }
        (delivered, failures)
    }
}
