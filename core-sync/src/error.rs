use core_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Sync already in progress")]
    SyncInProgress,

    #[error("Sync run {run_id} not found")]
    RunNotFound { run_id: String },

    #[error("Fetch failed for {module}: {reason}")]
    FetchFailed { module: String, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid run status: {0}")]
    InvalidStatus(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
