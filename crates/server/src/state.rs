//! Shared state handed to every handler as `State<Arc<AppState>>`.

use std::sync::{Arc, Mutex};

use ledgermerge_engine::{Importer, StagingArea};
use ledgermerge_storage::{RetryPolicy, SqliteLedger};

use crate::config::ServerConfig;
use crate::error::ApiError;

#[derive(Clone, Debug)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// The store and the importer each sit behind a blocking mutex; handlers
/// touch them only from `spawn_blocking`. Lock order is importer, then store.
pub struct AppState {
    pub build: BuildInfo,
    pub max_upload_bytes: u64,
    retry: RetryPolicy,
    store: Mutex<SqliteLedger>,
    importer: Mutex<Importer>,
}

impl AppState {
    pub fn new(store: SqliteLedger, importer: Importer, retry: RetryPolicy) -> Self {
        Self {
            build: BuildInfo::default(),
            max_upload_bytes: importer.staging().max_bytes(),
            retry,
            store: Mutex::new(store),
            importer: Mutex::new(importer),
        }
    }

    /// Open the ledger (with retry) and the staging area named by `config`.
    pub fn open(config: &ServerConfig) -> Result<Arc<Self>, ApiError> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ApiError::Internal(e.to_string()))?;
        }
        let store = SqliteLedger::open_with_retry(&config.db_path, &config.retry)?;
        let staging = StagingArea::new(&config.staging_dir, config.max_upload_bytes)?
            .with_max_entries(config.max_staged);
        let importer = Importer::new(staging, config.diff.clone());
        Ok(Arc::new(Self::new(store, importer, config.retry.clone())))
    }

    /// Run `f` with exclusive access to a connected store.
    pub fn with_store<T>(
        &self,
        f: impl FnOnce(&mut SqliteLedger) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut store = self
            .store
            .lock()
            .map_err(|_| ApiError::Internal("ledger lock poisoned".into()))?;
        store.ensure_connected(&self.retry)?;
        f(&mut *store)
    }

    /// Run `f` with the importer and a connected store.
    pub fn with_import<T>(
        &self,
        f: impl FnOnce(&mut Importer, &mut SqliteLedger) -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut importer = self
            .importer
            .lock()
            .map_err(|_| ApiError::Internal("importer lock poisoned".into()))?;
        self.with_store(|store| f(&mut *importer, store))
    }

    /// Run `f` with the importer alone.
    pub fn with_importer<T>(&self, f: impl FnOnce(&mut Importer) -> T) -> Result<T, ApiError> {
        let mut importer = self
            .importer
            .lock()
            .map_err(|_| ApiError::Internal("importer lock poisoned".into()))?;
        Ok(f(&mut *importer))
    }
}
