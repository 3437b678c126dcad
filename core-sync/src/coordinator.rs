//! # Sync Coordinator
//!
//! Runs module syncs under a single run lock.
//!
//! ## Overview
//!
//! The `SyncCoordinator` is the entry point for both the scheduler and manual
//! triggers. It:
//! - Rejects an overlapping invocation with [`SyncError::SyncInProgress`]
//! - Runs every module in a fixed order, one after another
//! - Tags each invocation with an id carried on its tracing span
//! - Collects per-module outcomes into a [`SyncReport`]
//!
//! A module that fails does not stop the modules after it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::SyncCoordinator;
//!
//! let report = coordinator.sync_all().await?;
//! for outcome in &report.modules {
//!     println!("{}: {}", outcome.module, outcome.message);
//! }
//! ```

use crate::reconciler::{ModuleOutcome, Reconciler};
use crate::run::SyncRun;
use crate::{Result, SyncError};
use async_trait::async_trait;
use core_store::Module;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Outcome of one coordinator invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub invocation_id: Uuid,
    /// One entry per module, in sync order
    pub modules: Vec<ModuleOutcome>,
}

impl SyncReport {
    pub fn get(&self, module: Module) -> Option<&ModuleOutcome> {
        self.modules.iter().find(|outcome| outcome.module == module)
    }

    pub fn all_ok(&self) -> bool {
        self.modules.iter().all(|outcome| outcome.ok)
    }

    pub fn failed_modules(&self) -> Vec<Module> {
        self.modules
            .iter()
            .filter(|outcome| !outcome.ok)
            .map(|outcome| outcome.module)
            .collect()
    }
}

/// Something the scheduler can fire
#[async_trait]
pub trait SyncTrigger: Send + Sync {
    async fn run_scheduled(&self) -> Result<SyncReport>;
}

pub struct SyncCoordinator {
    reconciler: Reconciler,
    run_lock: Mutex<()>,
}

impl SyncCoordinator {
    pub fn new(reconciler: Reconciler) -> Self {
        Self {
            reconciler,
            run_lock: Mutex::new(()),
        }
    }

    /// Sync every module in [`Module::ALL`] order
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SyncInProgress`] if another sync holds the run
    /// lock. Module failures are reported in the returned report.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        self.run_modules(&Module::ALL).await
    }

    /// Sync a single module under the run lock
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::SyncInProgress`] if another sync holds the run
    /// lock.
    pub async fn sync_module(&self, module: Module) -> Result<ModuleOutcome> {
        let _guard = self.run_lock.try_lock().map_err(|_| {
            warn!(module = %module, "Sync requested while another sync is running");
            SyncError::SyncInProgress
        })?;

        let invocation_id = Uuid::new_v4();
        let span = info_span!("sync", invocation_id = %invocation_id);
        Ok(self.reconciler.sync_module(module).instrument(span).await)
    }

    async fn run_modules(&self, modules: &[Module]) -> Result<SyncReport> {
        let _guard = self.run_lock.try_lock().map_err(|_| {
            warn!("Sync requested while another sync is running");
            SyncError::SyncInProgress
        })?;

        let invocation_id = Uuid::new_v4();
        let span = info_span!("sync", invocation_id = %invocation_id);

        async move {
            info!(modules = modules.len(), "Starting sync");
            let mut outcomes = Vec::with_capacity(modules.len());
            for module in modules {
                outcomes.push(self.reconciler.sync_module(*module).await);
            }

            let report = SyncReport {
                invocation_id,
                modules: outcomes,
            };
            if report.all_ok() {
                info!("Sync completed");
            } else {
                warn!(failed = ?report.failed_modules(), "Sync completed with failures");
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Whether a sync currently holds the run lock
    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Most recent runs across all modules, newest first
    pub async fn recent_runs(&self, limit: u32) -> Result<Vec<SyncRun>> {
        self.reconciler.runs().recent(limit).await
    }

    /// Run history for one module, newest first
    pub async fn history(&self, module: Module, limit: u32) -> Result<Vec<SyncRun>> {
        self.reconciler.runs().history(module, limit).await
    }
}

#[async_trait]
impl SyncTrigger for SyncCoordinator {
    async fn run_scheduled(&self) -> Result<SyncReport> {
        self.sync_all().await
    }
}

// ============================================================================
// Tests
// ============================================================================
