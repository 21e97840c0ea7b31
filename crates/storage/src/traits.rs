use ledgermerge_core::{
    entries::{TransactionEntry, TransferEntry},
    records::{Account, Category, LedgerRows, Transaction, Transfer},
};

use crate::error::StorageError;

/// Read access to the authoritative ledger plus a way to open a write transaction.
pub trait LedgerStore {
    type Writer<'a>: LedgerWriter
    where
        Self: 'a;

    /// Every row of every entity type, tombstones included.
    fn load_rows(&self) -> Result<LedgerRows, StorageError>;

    fn list_accounts(&self) -> Result<Vec<Account>, StorageError>;

    fn list_categories(&self) -> Result<Vec<Category>, StorageError>;

    fn list_transactions(
        &self,
        note_filter: Option<&str>,
    ) -> Result<Vec<TransactionEntry>, StorageError>;

    fn list_transfers(&self) -> Result<Vec<TransferEntry>, StorageError>;

    /// Open one exclusive write transaction. Nothing is visible to other
    /// readers until `LedgerWriter::commit`; dropping the writer rolls back.
    fn begin_write(&mut self) -> Result<Self::Writer<'_>, StorageError>;
}

pub trait LedgerWriter {
    /// Rows as seen from inside the transaction.
    fn load_rows(&self) -> Result<LedgerRows, StorageError>;

    fn put_account(&mut self, account: &Account) -> Result<(), StorageError>;

    fn put_category(&mut self, category: &Category) -> Result<(), StorageError>;

    fn put_transaction(&mut self, txn: &Transaction) -> Result<(), StorageError>;

    fn put_transfer(&mut self, transfer: &Transfer) -> Result<(), StorageError>;

    fn commit(self) -> Result<(), StorageError>
    where
        Self: Sized;
}
