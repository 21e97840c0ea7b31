use std::path::{Path, PathBuf};

use ledgermerge_core::records::LedgerRows;
use ledgermerge_engine::{DiffOptions, EngineError, Importer, MergeStats, StagingArea, merge_rows};
use ledgermerge_storage::{LedgerStore, SqliteLedger, StorageError};
use tempfile::TempDir;

use crate::snapshot;

const STAGING_LIMIT: u64 = 8 * 1024 * 1024;

/// A file-backed live ledger plus an importer staging into the same temp dir.
pub struct TestLedger {
    dir: TempDir,
    pub store: SqliteLedger,
    pub importer: Importer,
}

impl TestLedger {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_options(DiffOptions::default())
    }

    pub fn with_options(options: DiffOptions) -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let store = SqliteLedger::open(dir.path().join("ledger.db"))?;
        let staging = StagingArea::new(dir.path().join("temp"), STAGING_LIMIT)?;
        Ok(Self {
            dir,
            store,
            importer: Importer::new(staging, options),
        })
    }

    /// Bring the store to `rows` through the normal merge path.
    pub fn seed(&mut self, rows: &LedgerRows) -> Result<MergeStats, EngineError> {
        merge_rows(&mut self.store, rows)
    }

    pub fn rows(&self) -> Result<LedgerRows, StorageError> {
        self.store.load_rows()
    }

    pub fn staging_dir(&self) -> &Path {
        self.importer.staging().dir()
    }

    /// Files currently sitting in the staging dir.
    pub fn staged_files(&self) -> std::io::Result<Vec<PathBuf>> {
        std::fs::read_dir(self.staging_dir())?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }

    /// Write `rows` as an export next to the ledger and return its bytes.
    pub fn export_bytes(&self, name: &str, rows: &LedgerRows) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let path = self.dir.path().join(name);
        snapshot::write_rows(&path, rows)?;
        Ok(std::fs::read(&path)?)
    }

    /// Same as `export_bytes`, but the export is left in WAL journal mode.
    pub fn export_wal_bytes(&self, name: &str, rows: &LedgerRows) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let path = self.dir.path().join(name);
        snapshot::write_rows_wal(&path, rows)?;
        Ok(std::fs::read(&path)?)
    }
}
