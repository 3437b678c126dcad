//! # Module Reconciler
//!
//! Brings one local module table in line with the records the vendor
//! returned.
//!
//! ## Workflow
//!
//! 1. Open a run in the run log
//! 2. Fetch every record of the module from the [`RecordSource`]
//! 3. Load the existing `zoho_id -> id` index
//! 4. Upsert each fetched record in fetch order, committing every
//!    `batch_size` records
//! 5. Delete indexed rows the fetch did not return
//! 6. Finalize the run with the counts, or with the error text
//!
//! Per-record write failures are counted and skipped; anything else that goes
//! wrong fails the module and leaves other modules untouched.

use crate::mapping::{external_id, map_record};
use crate::repository::SyncRunRepository;
use crate::run::{SyncPhase, SyncRun};
use crate::{Result, SyncError};
use bridge_traits::crm::RecordSource;
use bridge_traits::time::Clock;
use core_runtime::CoreConfig;
use core_store::{EntityBatch, EntityStore, Module};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Settings for a reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Records written per transaction
    pub batch_size: usize,
    /// Run deletion against a fetch that aborted after some pages
    pub prune_on_partial_fetch: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            prune_on_partial_fetch: true,
        }
    }
}

impl From<&CoreConfig> for ReconcilerConfig {
    fn from(config: &CoreConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            prune_on_partial_fetch: config.prune_on_partial_fetch,
        }
    }
}

/// Counters for one module sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
    /// Records without a usable id
    pub skipped: u64,
    /// Records whose write was rejected
    pub failed: u64,
    /// Deletion was not run because the fetch was incomplete
    pub deletion_skipped: bool,
}

impl ReconcileStats {
    /// Rows written, as stored in `records_synced`
    pub fn records_synced(&self) -> u64 {
        self.inserted + self.updated
    }

    /// Run log message, e.g. `Inserted: 3, Updated: 1, Deleted: 0`
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Inserted: {}, Updated: {}, Deleted: {}",
            self.inserted, self.updated, self.deleted
        );
        if self.deletion_skipped {
            summary.push_str("; deletion skipped (incomplete fetch)");
        }
        summary
    }
}

/// Result of syncing one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleOutcome {
    pub module: Module,
    pub ok: bool,
    /// Count summary on success, error text on failure
    pub message: String,
    pub stats: Option<ReconcileStats>,
    /// Phase the sync was in when it failed
    pub failed_phase: Option<SyncPhase>,
}

impl ModuleOutcome {
    fn succeeded(module: Module, stats: ReconcileStats) -> Self {
        Self {
            module,
            ok: true,
            message: stats.summary(),
            stats: Some(stats),
            failed_phase: None,
        }
    }

    fn failed(module: Module, phase: SyncPhase, message: String) -> Self {
        Self {
            module,
            ok: false,
            message,
            stats: None,
            failed_phase: Some(phase),
        }
    }
}

// ============================================================================
// Batch Writer
// ============================================================================

/// Lazily opened write batch that commits every `batch_size` records.
///
/// Nothing is opened until the first write, so the store's connection stays
/// free for reads until then.
struct BatchWriter<'a> {
    store: &'a dyn EntityStore,
    module: Module,
    batch_size: usize,
    current: Option<Box<dyn EntityBatch>>,
    pending: usize,
}

impl<'a> BatchWriter<'a> {
    fn new(store: &'a dyn EntityStore, module: Module, batch_size: usize) -> Self {
        Self {
            store,
            module,
            batch_size: batch_size.max(1),
            current: None,
            pending: 0,
        }
    }

    async fn batch(&mut self) -> Result<&mut (dyn EntityBatch + 'static)> {
        if self.current.is_none() {
            self.current = Some(self.store.begin(self.module).await?);
        }
        match self.current.as_mut() {
            Some(batch) => Ok(batch.as_mut()),
            None => Err(SyncError::Database("write batch not open".to_string())),
        }
    }

    /// Count one processed record, committing when the batch is full
    async fn record_processed(&mut self) -> Result<()> {
        self.pending += 1;
        if self.pending >= self.batch_size {
            debug!(module = %self.module, records = self.pending, "Committing batch");
            self.commit().await?;
        }
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.pending = 0;
        if let Some(batch) = self.current.take() {
            batch.commit().await?;
        }
        Ok(())
    }

    async fn rollback(&mut self) {
        self.pending = 0;
        if let Some(batch) = self.current.take() {
            if let Err(e) = batch.rollback().await {
                warn!(module = %self.module, error = %e, "Failed to roll back batch");
            }
        }
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Syncs a single module into the local mirror
pub struct Reconciler {
    source: Arc<dyn RecordSource>,
    store: Arc<dyn EntityStore>,
    runs: Arc<dyn SyncRunRepository>,
    clock: Arc<dyn Clock>,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn RecordSource>,
        store: Arc<dyn EntityStore>,
        runs: Arc<dyn SyncRunRepository>,
        clock: Arc<dyn Clock>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            source,
            store,
            runs,
            clock,
            config,
        }
    }

    pub fn runs(&self) -> &Arc<dyn SyncRunRepository> {
        &self.runs
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Sync one module and record the run
    ///
    /// Never returns an error: failures are reported through the outcome and
    /// the run log.
    #[instrument(skip(self), fields(module = %module))]
    pub async fn sync_module(&self, module: Module) -> ModuleOutcome {
        debug!(phase = %SyncPhase::Started, "Opening sync run");
        let run = SyncRun::start(module, self.clock.unix_timestamp());
        let run = match self.runs.insert(&run).await {
            Ok(id) => run.with_id(id),
            Err(e) => {
                error!(error = %e, "Failed to open sync run");
                return ModuleOutcome::failed(module, SyncPhase::Started, e.to_string());
            }
        };

        let mut phase = SyncPhase::Started;
        let result = self.reconcile(module, &mut phase).await;
        let now = self.clock.unix_timestamp();

        let (finalized, outcome) = match result {
            Ok(stats) => {
                debug!(phase = %SyncPhase::Succeeded, "Module sync finished");
                info!(
                    inserted = stats.inserted,
                    updated = stats.updated,
                    deleted = stats.deleted,
                    skipped = stats.skipped,
                    failed = stats.failed,
                    "Synced {}",
                    module
                );
                (
                    run.succeed(stats.summary(), stats.records_synced(), now),
                    ModuleOutcome::succeeded(module, stats),
                )
            }
            Err(e) => {
                debug!(phase = %SyncPhase::Failed, failed_in = %phase, "Module sync failed");
                error!(error = %e, "Sync failed for {}", module);
                let message = e.to_string();
                (
                    run.fail(message.clone(), now),
                    ModuleOutcome::failed(module, phase, message),
                )
            }
        };

        match finalized {
            Ok(run) => {
                if let Err(e) = self.runs.update(&run).await {
                    error!(error = %e, "Failed to finalize sync run");
                }
            }
            Err(e) => error!(error = %e, "Invalid sync run transition"),
        }

        outcome
    }

    async fn reconcile(&self, module: Module, phase: &mut SyncPhase) -> Result<ReconcileStats> {
        *phase = SyncPhase::Fetching;
        debug!(phase = %phase, "Fetching records");
        let fetched = self.source.fetch_module(module.api_name()).await;

        if fetched.is_empty_failure() {
            let reason = fetched
                .abort
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            return Err(SyncError::FetchFailed {
                module: module.api_name().to_string(),
                reason,
            });
        }
        if let Some(abort) = &fetched.abort {
            warn!(
                records = fetched.records.len(),
                pages = fetched.pages_fetched,
                reason = %abort,
                "Fetch incomplete, continuing with retrieved records"
            );
        }

        *phase = SyncPhase::Mapping;
        debug!(phase = %phase, records = fetched.records.len(), "Mapping records");
        let mut index = self.store.load_index(module).await?;
        let mut writer = BatchWriter::new(self.store.as_ref(), module, self.config.batch_size);

        let result = self
            .apply(module, &fetched.records, fetched.is_complete(), &mut index, &mut writer, phase)
            .await;
        if result.is_err() {
            writer.rollback().await;
        }
        result
    }

    async fn apply(
        &self,
        module: Module,
        records: &[serde_json::Value],
        fetch_complete: bool,
        index: &mut std::collections::HashMap<String, i64>,
        writer: &mut BatchWriter<'_>,
        phase: &mut SyncPhase,
    ) -> Result<ReconcileStats> {
        let mut stats = ReconcileStats::default();
        let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
        let now = self.clock.unix_timestamp();

        for (position, record) in records.iter().enumerate() {
            let Some(zoho_id) = external_id(record) else {
                warn!(position, "Skipping record without id");
                stats.skipped += 1;
                continue;
            };
            seen.insert(zoho_id.clone());
            let entity = map_record(module, &zoho_id, record);

            let written = match index.get(&zoho_id).copied() {
                Some(id) => writer.batch().await?.update(id, &entity).await.map(|_| false),
                None => match writer.batch().await?.insert(&entity, now).await {
                    Ok(id) => {
                        index.insert(zoho_id.clone(), id);
                        Ok(true)
                    }
                    Err(e) => Err(e),
                },
            };

            match written {
                Ok(true) => stats.inserted += 1,
                Ok(false) => stats.updated += 1,
                Err(e) => {
                    warn!(zoho_id = %zoho_id, error = %e, "Failed to write record");
                    stats.failed += 1;
                }
            }

            writer.record_processed().await?;
        }

        *phase = SyncPhase::Committing;
        debug!(phase = %phase, "Committing changes");
        writer.commit().await?;

        if fetch_complete || self.config.prune_on_partial_fetch {
            let mut stale: Vec<i64> = index
                .iter()
                .filter(|(zoho_id, _)| !seen.contains(*zoho_id))
                .map(|(_, id)| *id)
                .collect();
            stale.sort_unstable();

            for id in stale {
                if writer.batch().await?.delete(id).await? {
                    stats.deleted += 1;
                }
            }
            writer.commit().await?;
        } else {
            info!("Fetch incomplete, skipping deletion");
            stats.deletion_skipped = true;
        }

        Ok(stats)
    }
}
