use std::path::{Path, PathBuf};

use rusqlite::{Connection, TransactionBehavior};
use tracing::{debug, info, warn};

use ledgermerge_core::{
    entries::{TransactionEntry, TransferEntry},
    records::{Account, Category, LedgerRows, Transaction, Transfer},
};

use crate::error::StorageError;
use crate::retry::RetryPolicy;
use crate::rows;
use crate::traits::{LedgerStore, LedgerWriter};
use crate::views;

pub struct SqliteLedger {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteLedger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        let version = crate::schema::schema_version(&conn)?;
        debug!(path = %path.display(), version, "ledger opened");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Open the store, retrying with backoff. Fails with
    /// `StorageError::Unavailable` once the policy is exhausted.
    pub fn open_with_retry(
        path: impl AsRef<Path>,
        policy: &RetryPolicy,
    ) -> Result<Self, StorageError> {
        let path = path.as_ref();
        policy.run("open ledger", || Self::open(path))
    }

    /// Probe the connection and reopen it under `policy` if the probe fails.
    /// In-memory stores cannot be reopened.
    pub fn ensure_connected(&mut self, policy: &RetryPolicy) -> Result<(), StorageError> {
        let probe: Result<i64, _> = self.conn.query_row("SELECT 1", [], |row| row.get(0));
        if probe.is_ok() {
            return Ok(());
        }
        let Some(path) = self.path.clone() else {
            return Err(StorageError::Unavailable {
                attempts: 0,
                reason: "in-memory ledger lost its connection".into(),
            });
        };
        warn!(path = %path.display(), "ledger connection unhealthy, reopening");
        *self = Self::open_with_retry(&path, policy)?;
        info!(path = %path.display(), "ledger connection restored");
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl LedgerStore for SqliteLedger {
    type Writer<'a> = SqliteWriter<'a>;

    fn load_rows(&self) -> Result<LedgerRows, StorageError> {
        rows::read_all(&self.conn)
    }

    fn list_accounts(&self) -> Result<Vec<Account>, StorageError> {
        views::list_accounts(&self.conn)
    }

    fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        views::list_categories(&self.conn)
    }

    fn list_transactions(
        &self,
        note_filter: Option<&str>,
    ) -> Result<Vec<TransactionEntry>, StorageError> {
        views::list_transactions(&self.conn, note_filter)
    }

    fn list_transfers(&self) -> Result<Vec<TransferEntry>, StorageError> {
        views::list_transfers(&self.conn)
    }

    fn begin_write(&mut self) -> Result<SqliteWriter<'_>, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(SqliteWriter { tx })
    }
}

/// A single IMMEDIATE transaction on the ledger. Rolls back on drop.
pub struct SqliteWriter<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl LedgerWriter for SqliteWriter<'_> {
    fn load_rows(&self) -> Result<LedgerRows, StorageError> {
        rows::read_all(&self.tx)
    }

    fn put_account(&mut self, account: &Account) -> Result<(), StorageError> {
        rows::put_account(&self.tx, account)
    }

    fn put_category(&mut self, category: &Category) -> Result<(), StorageError> {
        rows::put_category(&self.tx, category)
    }

    fn put_transaction(&mut self, txn: &Transaction) -> Result<(), StorageError> {
        rows::put_transaction(&self.tx, txn)
    }

    fn put_transfer(&mut self, transfer: &Transfer) -> Result<(), StorageError> {
        rows::put_transfer(&self.tx, transfer)
    }

    fn commit(self) -> Result<(), StorageError> {
        self.tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermerge_core::{ids::*, records::CategoryType};

    fn account(id: &str, title: &str, deleted_on: Option<i64>) -> Account {
        Account {
            id: AccountId::new(id),
            title: title.into(),
            initial_amount_cents: 1000,
            is_included_in_total_balance: true,
            created_on: 10,
            deleted_on,
            currency_id: Some(978),
            icon: Some("wallet".into()),
            hash_code: Some(-42),
        }
    }

    fn category(id: &str, title: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            title: title.into(),
            category_type: CategoryType::Expense,
            deleted_on: None,
        }
    }

    fn transaction(id: &str, created_on: i64, note: &str) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            account_id: AccountId::new("A1"),
            category_id: CategoryId::new("C1"),
            amount_cents: 2500,
            created_on,
            note: Some(note.into()),
            deleted_on: None,
        }
    }

    #[test]
    fn committed_rows_round_trip_with_metadata() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();
        let mut writer = ledger.begin_write().unwrap();
        writer.put_account(&account("A1", "Checking", None)).unwrap();
        writer.put_category(&category("C1", "Food")).unwrap();
        writer.commit().unwrap();

        let rows = ledger.load_rows().unwrap();
        assert_eq!(rows.accounts, vec![account("A1", "Checking", None)]);
        assert_eq!(rows.categories, vec![category("C1", "Food")]);
    }

    #[test]
    fn put_replaces_whole_row() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();
        let mut writer = ledger.begin_write().unwrap();
        writer.put_account(&account("A1", "Checking", None)).unwrap();
        let mut renamed = account("A1", "Current", Some(99));
        renamed.icon = None;
        writer.put_account(&renamed).unwrap();
        writer.commit().unwrap();

        let rows = ledger.load_rows().unwrap();
        assert_eq!(rows.accounts, vec![renamed]);
    }

    #[test]
    fn dropped_writer_rolls_back() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();
        {
            let mut writer = ledger.begin_write().unwrap();
            writer.put_category(&category("C1", "Food")).unwrap();
        }
        assert!(ledger.load_rows().unwrap().is_empty());
    }

    #[test]
    fn transaction_listing_joins_and_filters_by_note() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();
        let mut writer = ledger.begin_write().unwrap();
        writer.put_account(&account("A1", "Checking", None)).unwrap();
        writer.put_category(&category("C1", "Hosting")).unwrap();
        writer.put_transaction(&transaction("T1", 100, "Domain renewal")).unwrap();
        writer.put_transaction(&transaction("T2", 200, "coffee")).unwrap();
        writer.commit().unwrap();

        let all = ledger.list_transactions(None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, TransactionId::new("T2"));
        assert_eq!(all[0].account_name.as_deref(), Some("Checking"));
        assert_eq!(all[0].category_type, Some(CategoryType::Expense));

        let filtered = ledger.list_transactions(Some("DOMAIN")).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, TransactionId::new("T1"));
    }

    #[test]
    fn account_listing_hides_tombstones() {
        let mut ledger = SqliteLedger::open_in_memory().unwrap();
        let mut writer = ledger.begin_write().unwrap();
        writer.put_account(&account("A2", "Savings", None)).unwrap();
        writer.put_account(&account("A1", "Cash", Some(5))).unwrap();
        writer.put_account(&account("A3", "Brokerage", None)).unwrap();
        writer.commit().unwrap();

        let titles: Vec<String> = ledger
            .list_accounts()
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["Brokerage", "Savings"]);
    }

    #[test]
    fn reopens_file_backed_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let mut ledger = SqliteLedger::open_with_retry(&path, &RetryPolicy::none()).unwrap();
        ledger.ensure_connected(&RetryPolicy::none()).unwrap();
        assert_eq!(ledger.path(), Some(path.as_path()));
    }
}
