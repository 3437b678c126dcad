//! # Sync Run Repository
//!
//! Provides database persistence for sync runs.
//!
//! ## Overview
//!
//! This repository handles the append-only run log:
//! - Creating a run when a module sync starts
//! - Finalizing it when the sync ends
//! - Querying runs by module or status
//! - Run history retrieval

use crate::{Result, RunStatus, SyncError, SyncRun, SyncRunId};
use async_trait::async_trait;
use core_store::Module;
use sqlx::{FromRow, SqlitePool};

// ============================================================================
// Repository Trait
// ============================================================================

/// Repository trait for sync run persistence
#[async_trait]
pub trait SyncRunRepository: Send + Sync {
    /// Insert a new run, returning its id
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    async fn insert(&self, run: &SyncRun) -> Result<SyncRunId>;

    /// Write back a finalized run
    ///
    /// Only a stored run that is still `running` is written; finalized runs
    /// are never rewritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the run has no id, doesn't exist, is already
    /// finalized, or the database operation fails
    async fn update(&self, run: &SyncRun) -> Result<()>;

    /// Find a run by ID
    async fn find_by_id(&self, id: SyncRunId) -> Result<Option<SyncRun>>;

    /// Get the most recent run for a module
    async fn find_latest(&self, module: Module) -> Result<Option<SyncRun>>;

    /// Get run history for a module (most recent first)
    ///
    /// # Arguments
    ///
    /// * `module` - The module to get history for
    /// * `limit` - Maximum number of runs to return
    async fn history(&self, module: Module, limit: u32) -> Result<Vec<SyncRun>>;

    /// Get runs by status (most recent first)
    async fn find_by_status(&self, status: RunStatus) -> Result<Vec<SyncRun>>;

    /// Most recent runs across all modules
    async fn recent(&self, limit: u32) -> Result<Vec<SyncRun>>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of SyncRunRepository
pub struct SqliteSyncRunRepository {
    pool: SqlitePool,
}

impl SqliteSyncRunRepository {
    /// Create a new SQLite sync run repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_RUN: &str = r#"
    SELECT id, module, started_at, finished_at, status, message, records_synced
    FROM sync_runs
"#;

/// Database row representation of a sync run
#[derive(Debug, FromRow)]
struct SyncRunRow {
    id: i64,
    module: String,
    started_at: i64,
    finished_at: Option<i64>,
    status: String,
    message: Option<String>,
    records_synced: i64,
}

impl TryFrom<SyncRunRow> for SyncRun {
    type Error = SyncError;

    fn try_from(row: SyncRunRow) -> Result<Self> {
        let module: Module = row
            .module
            .parse()
            .map_err(|_| SyncError::Database(format!("Invalid module: {}", row.module)))?;
        let status: RunStatus = row.status.parse()?;

        Ok(SyncRun {
            id: Some(SyncRunId::new(row.id)),
            module,
            started_at: row.started_at,
            finished_at: row.finished_at,
            status,
            message: row.message,
            records_synced: row.records_synced.max(0) as u64,
        })
    }
}

fn into_runs(rows: Vec<SyncRunRow>) -> Result<Vec<SyncRun>> {
    rows.into_iter()
        .map(SyncRun::try_from)
        .collect::<Result<Vec<_>>>()
}

#[async_trait]
impl SyncRunRepository for SqliteSyncRunRepository {
    async fn insert(&self, run: &SyncRun) -> Result<SyncRunId> {
        let result = sqlx::query(
            r#"
            INSERT INTO sync_runs (
                module, started_at, finished_at, status, message, records_synced
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(run.module.api_name())
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(run.status.as_str())
        .bind(&run.message)
        .bind(run.records_synced as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        Ok(SyncRunId::new(result.last_insert_rowid()))
    }

    async fn update(&self, run: &SyncRun) -> Result<()> {
        let id = run.id.ok_or_else(|| SyncError::RunNotFound {
            run_id: "<unsaved>".to_string(),
        })?;

        let result = sqlx::query(
            r#"
            UPDATE sync_runs SET
                finished_at = ?,
                status = ?,
                message = ?,
                records_synced = ?
            WHERE id = ? AND status = 'running'
            "#,
        )
        .bind(run.finished_at)
        .bind(run.status.as_str())
        .bind(&run.message)
        .bind(run.records_synced as i64)
        .bind(id.value())
        .execute(&self.pool)
        .await
        .map_err(|e| SyncError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return match self.find_by_id(id).await? {
                Some(stored) => Err(SyncError::InvalidStateTransition {
                    from: stored.status.as_str().to_string(),
                    to: run.status.as_str().to_string(),
                    reason: format!("Sync run {} is already finalized", id),
                }),
                None => Err(SyncError::RunNotFound {
                    run_id: id.to_string(),
                }),
            };
        }

        Ok(())
    }

    async fn find_by_id(&self, id: SyncRunId) -> Result<Option<SyncRun>> {
        let sql = format!("{} WHERE id = ?", SELECT_RUN);
        let row = sqlx::query_as::<_, SyncRunRow>(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        row.map(SyncRun::try_from).transpose()
    }

    async fn find_latest(&self, module: Module) -> Result<Option<SyncRun>> {
        let sql = format!(
            "{} WHERE module = ? ORDER BY started_at DESC, id DESC LIMIT 1",
            SELECT_RUN
        );
        let row = sqlx::query_as::<_, SyncRunRow>(&sql)
            .bind(module.api_name())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        row.map(SyncRun::try_from).transpose()
    }

    async fn history(&self, module: Module, limit: u32) -> Result<Vec<SyncRun>> {
        let sql = format!(
            "{} WHERE module = ? ORDER BY started_at DESC, id DESC LIMIT ?",
            SELECT_RUN
        );
        let rows = sqlx::query_as::<_, SyncRunRow>(&sql)
            .bind(module.api_name())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        into_runs(rows)
    }

    async fn find_by_status(&self, status: RunStatus) -> Result<Vec<SyncRun>> {
        let sql = format!(
            "{} WHERE status = ? ORDER BY started_at DESC, id DESC",
            SELECT_RUN
        );
        let rows = sqlx::query_as::<_, SyncRunRow>(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        into_runs(rows)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<SyncRun>> {
        let sql = format!("{} ORDER BY started_at DESC, id DESC LIMIT ?", SELECT_RUN);
        let rows = sqlx::query_as::<_, SyncRunRow>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SyncError::Database(e.to_string()))?;

        into_runs(rows)
    }
}

// ============================================================================
// Tests
// ============================================================================
