//! Read-only access to a foreign ledger export.

use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use tracing::{debug, warn};

use ledgermerge_core::records::LedgerRows;

use crate::error::StorageError;
use crate::rows;
use crate::schema::missing_tables;

/// An open snapshot file. Consumed by `extract_all`, which closes it.
pub struct SnapshotHandle {
    conn: Connection,
    path: PathBuf,
}

impl SnapshotHandle {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(invalid(path, "file not found"));
        }
        // Immutable: no locks, and no -wal/-shm files even for a WAL-mode export.
        let conn = Connection::open_with_flags(
            immutable_uri(path)?,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| invalid(path, e))?;

        // sqlite opens lazily; the first query is what detects a non-database file.
        let missing = missing_tables(&conn).map_err(|e| invalid(path, e))?;
        if !missing.is_empty() {
            return Err(invalid(
                path,
                format!("missing table(s): {}", missing.join(", ")),
            ));
        }

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row of every entity type, tombstones included. The file is
    /// closed before this returns, whether or not the read succeeded.
    pub fn extract_all(self) -> Result<LedgerRows, StorageError> {
        let result = rows::read_all(&self.conn);
        let Self { conn, path } = self;
        if let Err((_, e)) = conn.close() {
            warn!(path = %path.display(), error = %e, "failed to close snapshot");
        }
        let rows = result.map_err(|e| invalid(&path, e))?;
        debug!(
            path = %path.display(),
            accounts = rows.accounts.len(),
            categories = rows.categories.len(),
            transactions = rows.transactions.len(),
            transfers = rows.transfers.len(),
            "snapshot extracted"
        );
        Ok(rows)
    }
}

/// Open, extract and close in one step.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<LedgerRows, StorageError> {
    SnapshotHandle::open(path)?.extract_all()
}

fn immutable_uri(path: &Path) -> Result<String, StorageError> {
    let raw = path
        .to_str()
        .ok_or_else(|| invalid(path, "path is not valid UTF-8"))?;
    let mut uri = String::with_capacity(raw.len() + 32);
    uri.push_str("file:");
    for c in raw.chars() {
        match c {
            '%' => uri.push_str("%25"),
            '?' => uri.push_str("%3f"),
            '#' => uri.push_str("%23"),
            _ => uri.push(c),
        }
    }
    uri.push_str("?mode=ro&immutable=1");
    Ok(uri)
}

fn invalid(path: &Path, reason: impl std::fmt::Display) -> StorageError {
    StorageError::InvalidSnapshot(format!("{}: {reason}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LedgerStore, LedgerWriter, SqliteLedger};
    use ledgermerge_core::{ids::*, records::Transaction};

    #[test]
    fn extracts_tombstoned_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.db");
        {
            let mut ledger = SqliteLedger::open(&path).unwrap();
            let mut writer = ledger.begin_write().unwrap();
            writer
                .put_transaction(&Transaction {
                    id: TransactionId::new("T1"),
                    account_id: AccountId::new("A1"),
                    category_id: CategoryId::new("C1"),
                    amount_cents: 500,
                    created_on: 200,
                    note: None,
                    deleted_on: Some(200),
                })
                .unwrap();
            writer.commit().unwrap();
            ledger.conn().execute_batch("PRAGMA journal_mode = DELETE;").unwrap();
        }

        let rows = load_snapshot(&path).unwrap();
        assert_eq!(rows.transactions.len(), 1);
        assert_eq!(rows.transactions[0].deleted_on, Some(200));
    }

    #[test]
    fn wal_mode_export_leaves_no_sidecar_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wal export.db");
        {
            let mut ledger = SqliteLedger::open(&path).unwrap();
            let mut writer = ledger.begin_write().unwrap();
            writer
                .put_account(&ledgermerge_core::records::Account {
                    id: AccountId::new("A1"),
                    title: "Checking".into(),
                    initial_amount_cents: 100,
                    is_included_in_total_balance: true,
                    created_on: 10,
                    deleted_on: None,
                    currency_id: None,
                    icon: None,
                    hash_code: None,
                })
                .unwrap();
            writer.commit().unwrap();
        }

        let rows = load_snapshot(&path).unwrap();
        assert_eq!(rows.accounts.len(), 1);
        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("wal export.db")]);
    }

    #[test]
    fn uri_escapes_reserved_characters() {
        let uri = immutable_uri(Path::new("/tmp/a?b#c%d.db")).unwrap();
        assert_eq!(uri, "file:/tmp/a%3fb%23c%25d.db?mode=ro&immutable=1");
    }

    #[test]
    fn rejects_file_that_is_not_a_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, b"definitely not sqlite, just some bytes padding it out").unwrap();
        match SnapshotHandle::open(&path) {
            Err(StorageError::InvalidSnapshot(msg)) => assert!(msg.contains("garbage.db")),
            Err(other) => panic!("expected InvalidSnapshot, got {other:?}"),
            Ok(_) => panic!("expected InvalidSnapshot, got a handle"),
        }
    }

    #[test]
    fn rejects_database_without_ledger_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch("CREATE TABLE accounts (_id TEXT PRIMARY KEY);")
                .unwrap();
        }
        match SnapshotHandle::open(&path) {
            Err(StorageError::InvalidSnapshot(msg)) => {
                assert!(msg.contains("categories"));
                assert!(msg.contains("transfers"));
            }
            Err(other) => panic!("expected InvalidSnapshot, got {other:?}"),
            Ok(_) => panic!("expected InvalidSnapshot, got a handle"),
        }
    }

    #[test]
    fn rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SnapshotHandle::open(dir.path().join("absent.db")),
            Err(StorageError::InvalidSnapshot(_))
        ));
    }
}
