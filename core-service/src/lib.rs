//! Core service façade and bootstrap helpers.
//!
//! This crate wires the record source, the mirror store and the run log into
//! a [`ZohoSyncService`] that hosts drive either on a schedule or manually.
//! Desktop hosts typically enable the `desktop-shims` feature (which depends
//! on `bridge-desktop` and `provider-zoho`) and call [`bootstrap`]; tests and
//! embedders can assemble [`ServiceDependencies`] by hand.

pub mod error;

pub use error::{CoreError, Result};

use std::sync::Arc;

use bridge_traits::{crm::RecordSource, time::Clock};
use core_runtime::{CoreConfig, ScheduleConfig};
use core_store::{EntityStore, Module};
use core_sync::{
    ModuleOutcome, Reconciler, ReconcilerConfig, SyncCoordinator, SyncReport, SyncRun,
    SyncRunRepository, SyncScheduler,
};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[cfg(feature = "desktop-shims")]
pub use desktop::bootstrap;

/// Aggregated handle to everything the sync engine requires.
pub struct ServiceDependencies {
    pub source: Arc<dyn RecordSource>,
    pub store: Arc<dyn EntityStore>,
    pub runs: Arc<dyn SyncRunRepository>,
    pub clock: Arc<dyn Clock>,
}

impl ServiceDependencies {
    /// Construct a dependency bundle from explicit handles.
    pub fn new(
        source: Arc<dyn RecordSource>,
        store: Arc<dyn EntityStore>,
        runs: Arc<dyn SyncRunRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            runs,
            clock,
        }
    }
}

/// Result of a manual trigger
#[derive(Debug, Clone, Serialize)]
pub struct ManualSyncOutcome {
    pub ok: bool,
    pub message: String,
    pub results: Option<SyncReport>,
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct ZohoSyncService {
    coordinator: Arc<SyncCoordinator>,
    clock: Arc<dyn Clock>,
    schedule: ScheduleConfig,
}

impl ZohoSyncService {
    /// Create a new service from the provided dependencies.
    pub fn new(deps: ServiceDependencies, config: &CoreConfig) -> Self {
        let reconciler = Reconciler::new(
            deps.source,
            deps.store,
            deps.runs,
            Arc::clone(&deps.clock),
            ReconcilerConfig::from(config),
        );

        Self {
            coordinator: Arc::new(SyncCoordinator::new(reconciler)),
            clock: deps.clock,
            schedule: config.schedule,
        }
    }

    pub fn coordinator(&self) -> Arc<SyncCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Sync every module once.
    ///
    /// # Errors
    ///
    /// Fails only when another sync is already running.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        Ok(self.coordinator.sync_all().await?)
    }

    pub async fn sync_module(&self, module: Module) -> Result<ModuleOutcome> {
        Ok(self.coordinator.sync_module(module).await?)
    }

    /// Run a full sync on request, reporting failures in the outcome.
    pub async fn manual_sync(&self) -> ManualSyncOutcome {
        info!("Manual sync requested");
        match self.coordinator.sync_all().await {
            Ok(report) => ManualSyncOutcome {
                ok: true,
                message: "Sync completed".to_string(),
                results: Some(report),
            },
            Err(e) => {
                warn!(error = %e, "Manual sync rejected");
                ManualSyncOutcome {
                    ok: false,
                    message: e.to_string(),
                    results: None,
                }
            }
        }
    }

    /// Start the scheduler loop on the current tokio runtime.
    ///
    /// The loop runs until `cancel` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured schedule is invalid.
    pub fn spawn_scheduler(&self, cancel: CancellationToken) -> Result<JoinHandle<()>> {
        let scheduler = SyncScheduler::new(
            self.coordinator.clone(),
            &self.schedule,
            Arc::clone(&self.clock),
        )?;
        Ok(tokio::spawn(Arc::new(scheduler).run(cancel)))
    }

    /// Most recent runs across all modules, newest first.
    pub async fn recent_runs(&self, limit: u32) -> Result<Vec<SyncRun>> {
        Ok(self.coordinator.recent_runs(limit).await?)
    }

    pub async fn history(&self, module: Module, limit: u32) -> Result<Vec<SyncRun>> {
        Ok(self.coordinator.history(module, limit).await?)
    }
}

#[cfg(feature = "desktop-shims")]
mod desktop {
    use super::*;
    use bridge_desktop::ReqwestHttpClient;
    use bridge_traits::{http::HttpClient, time::SystemClock};
    use core_auth::TokenManager;
    use core_store::{create_pool, DatabaseConfig, SqliteEntityStore};
    use core_sync::SqliteSyncRunRepository;
    use provider_zoho::ZohoConnector;

    /// Convenience bootstrapper for desktop hosts.
    ///
    /// Opens (and migrates) the database at `config.database_path` and wires
    /// the reqwest client, token manager and Zoho connector.
    ///
    /// ```no_run
    /// # async fn example() -> core_service::Result<()> {
    /// use core_runtime::CoreConfig;
    /// use tokio_util::sync::CancellationToken;
    ///
    /// let service = core_service::bootstrap(CoreConfig::from_env()?).await?;
    /// let scheduler = service.spawn_scheduler(CancellationToken::new())?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn bootstrap(config: CoreConfig) -> Result<ZohoSyncService> {
        config.validate()?;

        let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(
            config.request_timeout,
            config.max_retries,
        )?);

        let pool = create_pool(DatabaseConfig::new(config.database_path.clone())).await?;
        let tokens = Arc::new(TokenManager::from_core_config(&config, Arc::clone(&http))?);
        let connector = ZohoConnector::from_core_config(&config, http, tokens);

        let deps = ServiceDependencies::new(
            Arc::new(connector),
            Arc::new(SqliteEntityStore::new(pool.clone())),
            Arc::new(SqliteSyncRunRepository::new(pool)),
            Arc::new(SystemClock),
        );

        info!(
            database = %config.database_path.display(),
            api = %config.base_url(),
            "Sync service ready"
        );
        Ok(ZohoSyncService::new(deps, &config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::crm::{FetchAbort, FetchOutcome};
    use bridge_traits::time::SystemClock;
    use core_store::{create_test_pool, SqliteEntityStore};
    use core_sync::SqliteSyncRunRepository;
    use serde_json::json;
    use tokio::sync::Notify;

    struct FixedSource;

    #[async_trait]
    impl RecordSource for FixedSource {
        async fn fetch_module(&self, module: &str) -> FetchOutcome {
            match module {
                "Contacts" => FetchOutcome::complete(
                    vec![json!({"id": "c1", "Full_Name": "Ada Lovelace"})],
                    1,
                ),
                "Notes" => FetchOutcome::aborted(
                    vec![],
                    0,
                    FetchAbort::Status {
                        status: 500,
                        body: "internal".to_string(),
                    },
                ),
                _ => FetchOutcome::complete(vec![], 1),
            }
        }
    }

    struct BlockingSource {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl RecordSource for BlockingSource {
        async fn fetch_module(&self, _module: &str) -> FetchOutcome {
            self.entered.notify_one();
            self.release.notified().await;
            FetchOutcome::complete(vec![], 1)
        }
    }

    fn test_config() -> CoreConfig {
        CoreConfig::builder()
            .client_id("id")
            .client_secret("secret")
            .refresh_token("refresh")
            .build()
            .unwrap()
    }

    async fn service_with(source: Arc<dyn RecordSource>) -> ZohoSyncService {
        let pool = create_test_pool().await.unwrap();
        let deps = ServiceDependencies::new(
            source,
            Arc::new(SqliteEntityStore::new(pool.clone())),
            Arc::new(SqliteSyncRunRepository::new(pool)),
            Arc::new(SystemClock),
        );
        ZohoSyncService::new(deps, &test_config())
    }

    #[tokio::test]
    async fn test_manual_sync_reports_per_module_results() {
        let service = service_with(Arc::new(FixedSource)).await;

        let outcome = service.manual_sync().await;
        assert!(outcome.ok);
        assert_eq!(outcome.message, "Sync completed");

        let report = outcome.results.unwrap();
        assert!(report.get(Module::Contacts).unwrap().ok);
        let notes = report.get(Module::Notes).unwrap();
        assert!(!notes.ok);
        assert!(notes.message.contains("unexpected status 500"));

        let runs = service.recent_runs(10).await.unwrap();
        assert_eq!(runs.len(), Module::ALL.len());
    }

    #[tokio::test]
    async fn test_manual_sync_while_running_is_rejected() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let service = service_with(Arc::new(BlockingSource {
            entered: entered.clone(),
            release: release.clone(),
        }))
        .await;

        let background = {
            let service = service.clone();
            tokio::spawn(async move { service.sync_module(Module::Tasks).await })
        };
        entered.notified().await;

        let outcome = service.manual_sync().await;
        assert!(!outcome.ok);
        assert_eq!(outcome.message, "Sync already in progress");
        assert!(outcome.results.is_none());

        release.notify_one();
        assert!(background.await.unwrap().unwrap().ok);
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_cancel() {
        let service = service_with(Arc::new(FixedSource)).await;
        let cancel = CancellationToken::new();

        let handle = service.spawn_scheduler(cancel.clone()).unwrap();
        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn test_manual_outcome_serializes() {
        let outcome = ManualSyncOutcome {
            ok: false,
            message: "Sync already in progress".to_string(),
            results: None,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["results"], json!(null));
    }
}
