//! # Sync Engine
//!
//! Mirrors Zoho Bigin modules into the local store.
//!
//! ## Overview
//!
//! This module manages the lifecycle of module syncs, including:
//! - Normalizing loosely typed vendor fields
//! - Mapping records onto module tables via static field tables
//! - Reconciling fetched records with stored rows (upsert and delete)
//! - Recording every module sync in the run log
//! - Running full syncs on a schedule or on demand
//!
//! ## Components
//!
//! - **Normalizer** (`normalize`): Tolerant conversions from JSON values
//! - **Field Tables** (`mapping`): Per-module column mappings and `map_record`
//! - **Sync Run State Machine** (`run`): Run lifecycle with validated transitions
//! - **Repository** (`repository`): Database persistence for the run log
//! - **Reconciler** (`reconciler`): Per-module sync
//! - **Sync Coordinator** (`coordinator`): Run lock and module ordering
//! - **Scheduler** (`scheduler`): Cadence evaluation and the polling loop

pub mod coordinator;
pub mod error;
pub mod mapping;
pub mod normalize;
pub mod reconciler;
pub mod repository;
pub mod run;
pub mod scheduler;

pub use coordinator::{SyncCoordinator, SyncReport, SyncTrigger};
pub use error::{Result, SyncError};
pub use mapping::{field_table, map_record, Converter, FieldMapping};
pub use reconciler::{ModuleOutcome, ReconcileStats, Reconciler, ReconcilerConfig};
pub use repository::{SqliteSyncRunRepository, SyncRunRepository};
pub use run::{RunStatus, SyncPhase, SyncRun, SyncRunId};
pub use scheduler::{Schedule, ScheduleState, SyncScheduler, TickOutcome};
