use std::path::{Path, PathBuf};

use ledgermerge_core::records::LedgerRows;
use ledgermerge_storage::{LedgerStore, LedgerWriter, SqliteLedger, StorageError};
use tempfile::TempDir;

/// A foreign ledger export written to its own temp dir. Tombstoned rows are
/// stored as given.
pub struct SnapshotFile {
    _dir: TempDir,
    path: PathBuf,
}

impl SnapshotFile {
    pub fn write(rows: &LedgerRows) -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("export.db");
        write_rows(&path, rows)?;
        Ok(Self { _dir: dir, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> std::io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

/// Write `rows` into a fresh single-file sqlite database at `path`.
pub fn write_rows(path: &Path, rows: &LedgerRows) -> Result<(), StorageError> {
    let mut ledger = fill(path, rows)?;
    // Fold the WAL back in so the export is a rollback-journal file.
    ledger.conn().execute_batch("PRAGMA journal_mode = DELETE;")?;
    Ok(())
}

/// Like `write_rows`, but the file keeps the store's WAL journal mode, as a
/// copy of a live ledger would.
pub fn write_rows_wal(path: &Path, rows: &LedgerRows) -> Result<(), StorageError> {
    fill(path, rows).map(drop)
}

fn fill(path: &Path, rows: &LedgerRows) -> Result<SqliteLedger, StorageError> {
    let mut ledger = SqliteLedger::open(path)?;
    let mut writer = ledger.begin_write()?;
    for account in &rows.accounts {
        writer.put_account(account)?;
    }
    for category in &rows.categories {
        writer.put_category(category)?;
    }
    for txn in &rows.transactions {
        writer.put_transaction(txn)?;
    }
    for transfer in &rows.transfers {
        writer.put_transfer(transfer)?;
    }
    writer.commit()?;
    Ok(ledger)
}
