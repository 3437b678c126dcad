//! # Sync Run State Machine
//!
//! One audited execution of a module sync.
//!
//! ## State Machine
//!
//! ```text
//! Running → Success
//!     ↓
//!     └──→ Failed
//! ```
//!
//! A run is created `Running` when the module sync starts and finalized
//! exactly once. Terminal runs reject further transitions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::SyncRun;
//! use core_store::Module;
//!
//! let run = SyncRun::start(Module::Contacts, clock.unix_timestamp());
//! let run = run.succeed("Inserted: 3, Updated: 1, Deleted: 0", 4, clock.unix_timestamp())?;
//! ```

use crate::{Result, SyncError};
use core_store::Module;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// ID Types
// ============================================================================

/// Row id of a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SyncRunId(i64);

impl SyncRunId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SyncRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// Status column of `sync_runs`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Failed)
    }

    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        }
    }
}

impl FromStr for RunStatus {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(SyncError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Phases a module sync moves through
///
/// Only used for tracing and for reporting where a failed sync stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    Started,
    Fetching,
    Mapping,
    Committing,
    Succeeded,
    Failed,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Started => "started",
            SyncPhase::Fetching => "fetching",
            SyncPhase::Mapping => "mapping",
            SyncPhase::Committing => "committing",
            SyncPhase::Succeeded => "succeeded",
            SyncPhase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Sync Run Entity
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRun {
    /// Assigned once the run is persisted
    pub id: Option<SyncRunId>,
    pub module: Module,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub status: RunStatus,
    /// Count summary on success, error text on failure
    pub message: Option<String>,
    /// Inserted plus updated rows
    pub records_synced: u64,
}

impl SyncRun {
    /// Begin a run in `Running`
    pub fn start(module: Module, now: i64) -> Self {
        Self {
            id: None,
            module,
            started_at: now,
            finished_at: None,
            status: RunStatus::Running,
            message: None,
            records_synced: 0,
        }
    }

    pub fn with_id(mut self, id: SyncRunId) -> Self {
        self.id = Some(id);
        self
    }

    /// Finalize as `Success`
    ///
    /// # Errors
    ///
    /// Returns an error if the run is already terminal
    pub fn succeed(mut self, summary: impl Into<String>, records: u64, now: i64) -> Result<Self> {
        self.validate_transition(RunStatus::Success)?;
        self.status = RunStatus::Success;
        self.finished_at = Some(now);
        self.message = Some(summary.into());
        self.records_synced = records;
        Ok(self)
    }

    /// Finalize as `Failed`
    ///
    /// # Errors
    ///
    /// Returns an error if the run is already terminal
    pub fn fail(mut self, message: impl Into<String>, now: i64) -> Result<Self> {
        self.validate_transition(RunStatus::Failed)?;
        self.status = RunStatus::Failed;
        self.finished_at = Some(now);
        self.message = Some(message.into());
        self.records_synced = 0;
        Ok(self)
    }

    /// Seconds between start and finish, once finished
    pub fn duration_secs(&self) -> Option<u64> {
        self.finished_at
            .map(|end| end.saturating_sub(self.started_at).max(0) as u64)
    }

    fn validate_transition(&self, to: RunStatus) -> Result<()> {
        let valid = matches!(
            (self.status, to),
            (RunStatus::Running, RunStatus::Success) | (RunStatus::Running, RunStatus::Failed)
        );

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.status.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
