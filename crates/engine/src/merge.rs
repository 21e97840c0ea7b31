//! Atomic application of a snapshot to the live ledger.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ledgermerge_core::{
    id_map::IdMap,
    records::{LedgerRows, Record, Versioned},
};
use ledgermerge_storage::{LedgerStore, LedgerWriter, StorageError, load_snapshot};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    pub accounts_added: u64,
    pub accounts_updated: u64,
    pub categories_added: u64,
    pub transactions_added: u64,
    pub transactions_deleted: u64,
    pub transfers_added: u64,
    pub transfers_deleted: u64,
}

impl MergeStats {
    pub fn has_changes(&self) -> bool {
        *self != Self::default()
    }
}

/// Load the snapshot at `path`, then merge it into `store` in one transaction.
/// The snapshot file is closed before the transaction opens.
pub fn merge_snapshot<S: LedgerStore>(store: &mut S, path: &Path) -> Result<MergeStats, EngineError> {
    let incoming = load_snapshot(path).map_err(EngineError::on_read)?;
    let stats = merge_rows(store, &incoming)?;
    info!(
        path = %path.display(),
        accounts_added = stats.accounts_added,
        accounts_updated = stats.accounts_updated,
        categories_added = stats.categories_added,
        transactions_added = stats.transactions_added,
        transactions_deleted = stats.transactions_deleted,
        transfers_added = stats.transfers_added,
        transfers_deleted = stats.transfers_deleted,
        "snapshot merged"
    );
    Ok(stats)
}

/// Apply `incoming` to `store`. Either every row lands or none does.
///
/// Versioned rows are matched by id: an unseen id is inserted, a strictly
/// newer `createdOn` replaces the whole row, anything else is left alone.
/// Categories have no clock, so a matching id always overwrites.
/// Rows that arrive already tombstoned are stored but not counted as added.
pub fn merge_rows<S: LedgerStore>(store: &mut S, incoming: &LedgerRows) -> Result<MergeStats, EngineError> {
    let mut writer = store.begin_write().map_err(|e| match e {
        StorageError::Unavailable { .. } | StorageError::Sqlite(_) => {
            EngineError::StoreUnavailable(e.to_string())
        }
        other => EngineError::on_write(other),
    })?;
    let live = writer.load_rows().map_err(EngineError::on_write)?;
    let mut stats = MergeStats::default();

    let mut accounts: IdMap<_> = live.accounts.into_iter().collect();
    let tally = reconcile_versioned(&mut accounts, &incoming.accounts, |row| writer.put_account(row))?;
    stats.accounts_added = tally.added;
    stats.accounts_updated = tally.replaced;

    let mut categories: IdMap<_> = live.categories.into_iter().collect();
    for category in &incoming.categories {
        if categories.upsert(category.clone()).is_none() && !category.is_deleted() {
            stats.categories_added += 1;
        }
        writer.put_category(category).map_err(EngineError::on_write)?;
    }

    let mut transactions: IdMap<_> = live.transactions.into_iter().collect();
    let tally = reconcile_versioned(&mut transactions, &incoming.transactions, |row| {
        writer.put_transaction(row)
    })?;
    stats.transactions_added = tally.added;
    stats.transactions_deleted = tally.tombstoned;

    let mut transfers: IdMap<_> = live.transfers.into_iter().collect();
    let tally = reconcile_versioned(&mut transfers, &incoming.transfers, |row| writer.put_transfer(row))?;
    stats.transfers_added = tally.added;
    stats.transfers_deleted = tally.tombstoned;

    writer.commit().map_err(EngineError::on_write)?;
    Ok(stats)
}

#[derive(Debug, Default)]
struct Tally {
    added: u64,
    replaced: u64,
    /// Replacements that turned a live row into a tombstone.
    tombstoned: u64,
    arrived_deleted: u64,
}

fn reconcile_versioned<R, F>(live: &mut IdMap<R>, incoming: &[R], mut put: F) -> Result<Tally, EngineError>
where
    R: Versioned,
    F: FnMut(&R) -> Result<(), StorageError>,
{
    let mut tally = Tally::default();
    for row in incoming {
        let was_deleted = match live.get(row.id()) {
            None => {
                if row.is_deleted() {
                    tally.arrived_deleted += 1;
                } else {
                    tally.added += 1;
                }
                None
            }
            Some(current) if row.supersedes(current) => {
                tally.replaced += 1;
                Some(current.is_deleted())
            }
            Some(_) => continue,
        };
        if was_deleted == Some(false) && row.is_deleted() {
            tally.tombstoned += 1;
        }
        put(row).map_err(EngineError::on_write)?;
        // Duplicate ids inside one snapshot are judged against what was just written.
        live.upsert(row.clone());
    }
    if tally.arrived_deleted > 0 {
        debug!(count = tally.arrived_deleted, "inserted rows already tombstoned");
    }
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermerge_core::{ids::*, records::*};
    use ledgermerge_storage::SqliteLedger;

    fn txn(id: &str, created_on: i64, deleted_on: Option<i64>) -> Transaction {
        Transaction {
            id: TransactionId::new(id),
            account_id: AccountId::new("A1"),
            category_id: CategoryId::new("C1"),
            amount_cents: 500,
            created_on,
            note: None,
            deleted_on,
        }
    }

    fn seed(store: &mut SqliteLedger, rows: &LedgerRows) {
        merge_rows(store, rows).unwrap();
    }

    #[test]
    fn stats_serialize_as_seven_camel_case_counters() {
        let json = serde_json::to_value(MergeStats::default()).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 7);
        assert!(keys.contains(&"transactionsDeleted".to_string()));
        assert!(keys.contains(&"accountsUpdated".to_string()));
        assert!(!MergeStats::default().has_changes());
    }

    #[test]
    fn older_or_equal_clock_leaves_row_untouched() {
        let mut store = SqliteLedger::open_in_memory().unwrap();
        seed(
            &mut store,
            &LedgerRows {
                transactions: vec![txn("T1", 200, None)],
                ..Default::default()
            },
        );

        let mut stale = txn("T1", 200, Some(300));
        stale.amount_cents = 1;
        let stats = merge_rows(
            &mut store,
            &LedgerRows {
                transactions: vec![stale, txn("T1", 150, Some(150))],
                ..Default::default()
            },
        )
        .unwrap();

        assert!(!stats.has_changes());
        assert_eq!(store.load_rows().unwrap().transactions, vec![txn("T1", 200, None)]);
    }

    #[test]
    fn tombstoned_on_arrival_is_stored_but_not_counted() {
        let mut store = SqliteLedger::open_in_memory().unwrap();
        let stats = merge_rows(
            &mut store,
            &LedgerRows {
                transactions: vec![txn("T1", 100, Some(100)), txn("T2", 100, None)],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(stats.transactions_added, 1);
        assert_eq!(stats.transactions_deleted, 0);
        assert_eq!(store.load_rows().unwrap().transactions.len(), 2);
    }

    #[test]
    fn duplicate_ids_in_snapshot_resolve_by_clock() {
        let mut store = SqliteLedger::open_in_memory().unwrap();
        let stats = merge_rows(
            &mut store,
            &LedgerRows {
                transactions: vec![txn("T1", 300, None), txn("T1", 100, Some(100))],
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(stats.transactions_added, 1);
        assert_eq!(store.load_rows().unwrap().transactions, vec![txn("T1", 300, None)]);
    }

    #[test]
    fn revived_row_counts_as_update_not_delete() {
        let mut store = SqliteLedger::open_in_memory().unwrap();
        seed(
            &mut store,
            &LedgerRows {
                transactions: vec![txn("T1", 100, Some(100))],
                ..Default::default()
            },
        );
        let stats = merge_rows(
            &mut store,
            &LedgerRows {
                transactions: vec![txn("T1", 200, None)],
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(stats.transactions_deleted, 0);
        assert_eq!(stats.transactions_added, 0);
        assert_eq!(store.load_rows().unwrap().transactions[0].deleted_on, None);
    }
}
