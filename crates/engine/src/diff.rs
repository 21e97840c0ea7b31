//! Read-only comparison of a snapshot against the live ledger.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use ledgermerge_core::{
    CoreError,
    entries::{TransactionEntry, TransferEntry},
    id_map::IdMap,
    records::{Account, Category, LedgerRows, Record, Transaction, Transfer, Versioned},
};
use ledgermerge_storage::{LedgerStore, load_snapshot};

use crate::error::EngineError;

/// Transaction and transfer detail lists look at this many of the snapshot's
/// most recent rows.
pub const DEFAULT_DETAIL_LIMIT: usize = 100;

/// How accounts and categories are paired between the store and a snapshot.
/// Transactions and transfers always pair by id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Pair by id, the key the merge uses.
    #[default]
    ById,
    /// Pair by title. A renamed row shows up as new here but as an update in the merge.
    ByTitle,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ById => "id",
            Self::ByTitle => "title",
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Ok(Self::ById),
            "title" => Ok(Self::ByTitle),
            other => Err(CoreError::InvalidData(format!("unknown match strategy: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    pub detail_limit: usize,
    pub match_strategy: MatchStrategy,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            detail_limit: DEFAULT_DETAIL_LIMIT,
            match_strategy: MatchStrategy::default(),
        }
    }
}

/// Earliest and latest non-deleted `createdOn`; both `None` when there are no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: Option<i64>,
    pub latest: Option<i64>,
}

impl DateRange {
    pub fn of<R: Versioned>(rows: &[R]) -> Self {
        let mut live = rows.iter().filter(|r| !r.is_deleted()).map(|r| r.created_on());
        let Some(first) = live.next() else {
            return Self::default();
        };
        let (earliest, latest) = live.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
        Self {
            earliest: Some(earliest),
            latest: Some(latest),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDiff {
    pub title: String,
    pub current_balance: i64,
    pub new_balance: i64,
    pub diff: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDiff {
    pub current: usize,
    pub new: usize,
    pub new_items: Vec<Account>,
    pub balance_diffs: Vec<BalanceDiff>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDiff {
    pub current: usize,
    pub new: usize,
    pub new_items: Vec<Category>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDiff {
    pub current: usize,
    pub new: usize,
    pub new_items: Vec<TransactionEntry>,
    pub deleted_items: Vec<TransactionEntry>,
    pub current_date_range: DateRange,
    pub new_date_range: DateRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferDiff {
    pub current: usize,
    pub new: usize,
    pub new_items: Vec<TransferEntry>,
    pub deleted_items: Vec<TransferEntry>,
    pub current_date_range: DateRange,
    pub new_date_range: DateRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    pub accounts: AccountDiff,
    pub categories: CategoryDiff,
    pub transactions: TransactionDiff,
    pub transfers: TransferDiff,
}

/// Compare the snapshot at `path` with the live store. Never writes.
pub fn diff_snapshot<S: LedgerStore>(
    store: &S,
    path: &Path,
    options: &DiffOptions,
) -> Result<DiffReport, EngineError> {
    let incoming = load_snapshot(path).map_err(EngineError::on_read)?;
    let live = store.load_rows().map_err(EngineError::on_read)?;
    let report = compare(&live, &incoming, options);
    info!(
        path = %path.display(),
        strategy = options.match_strategy.as_str(),
        new_accounts = report.accounts.new_items.len(),
        new_categories = report.categories.new_items.len(),
        new_transactions = report.transactions.new_items.len(),
        deleted_transactions = report.transactions.deleted_items.len(),
        new_transfers = report.transfers.new_items.len(),
        deleted_transfers = report.transfers.deleted_items.len(),
        "snapshot diff computed"
    );
    Ok(report)
}

pub fn compare(live: &LedgerRows, incoming: &LedgerRows, options: &DiffOptions) -> DiffReport {
    let live_counts = live.live_counts();
    let incoming_counts = incoming.live_counts();

    let live_accounts: IdMap<Account> = live.accounts.iter().collect();
    let live_categories: IdMap<Category> = live.categories.iter().collect();
    let incoming_accounts: IdMap<Account> = incoming.accounts.iter().collect();
    let incoming_categories: IdMap<Category> = incoming.categories.iter().collect();

    let (new_accounts, balance_diffs) = match options.match_strategy {
        MatchStrategy::ById => accounts_by_id(&live_accounts, &incoming.accounts),
        MatchStrategy::ByTitle => accounts_by_title(&live.accounts, &incoming.accounts),
    };
    let new_categories = match options.match_strategy {
        MatchStrategy::ById => categories_by_id(&live_categories, &incoming.categories),
        MatchStrategy::ByTitle => categories_by_title(&live.categories, &incoming.categories),
    };

    let live_transactions: IdMap<Transaction> = live.transactions.iter().collect();
    let txn_delta = id_delta(&live_transactions, &incoming.transactions, options.detail_limit);
    let live_transfers: IdMap<Transfer> = live.transfers.iter().collect();
    let transfer_delta = id_delta(&live_transfers, &incoming.transfers, options.detail_limit);

    DiffReport {
        accounts: AccountDiff {
            current: live_counts.accounts,
            new: incoming_counts.accounts,
            new_items: new_accounts,
            balance_diffs,
        },
        categories: CategoryDiff {
            current: live_counts.categories,
            new: incoming_counts.categories,
            new_items: new_categories,
        },
        transactions: TransactionDiff {
            current: live_counts.transactions,
            new: incoming_counts.transactions,
            new_items: txn_delta
                .added
                .iter()
                .map(|t| TransactionEntry::join(t, &incoming_accounts, &incoming_categories))
                .collect(),
            deleted_items: txn_delta
                .removed
                .iter()
                .map(|t| TransactionEntry::join(t, &live_accounts, &live_categories))
                .collect(),
            current_date_range: DateRange::of(&live.transactions),
            new_date_range: DateRange::of(&incoming.transactions),
        },
        transfers: TransferDiff {
            current: live_counts.transfers,
            new: incoming_counts.transfers,
            new_items: transfer_delta
                .added
                .iter()
                .map(|t| TransferEntry::join(t, &incoming_accounts))
                .collect(),
            deleted_items: transfer_delta
                .removed
                .iter()
                .map(|t| TransferEntry::join(t, &live_accounts))
                .collect(),
            current_date_range: DateRange::of(&live.transfers),
            new_date_range: DateRange::of(&incoming.transfers),
        },
    }
}

fn accounts_by_id(live: &IdMap<Account>, incoming: &[Account]) -> (Vec<Account>, Vec<BalanceDiff>) {
    let mut new_items = Vec::new();
    let mut balance_diffs = Vec::new();
    for account in incoming.iter().filter(|a| !a.is_deleted()) {
        match live.get(&account.id) {
            None => new_items.push(account.clone()),
            Some(current) if !current.is_deleted() => {
                if let Some(diff) = balance_diff(current, account) {
                    balance_diffs.push(diff);
                }
            }
            Some(_) => {}
        }
    }
    sort_by_title(&mut new_items, &mut balance_diffs);
    (new_items, balance_diffs)
}

fn accounts_by_title(live: &[Account], incoming: &[Account]) -> (Vec<Account>, Vec<BalanceDiff>) {
    let by_title: HashMap<&str, &Account> = live
        .iter()
        .filter(|a| !a.is_deleted())
        .map(|a| (a.title.as_str(), a))
        .collect();
    let mut new_items = Vec::new();
    let mut balance_diffs = Vec::new();
    for account in incoming.iter().filter(|a| !a.is_deleted()) {
        match by_title.get(account.title.as_str()) {
            None => new_items.push(account.clone()),
            Some(current) => {
                if let Some(diff) = balance_diff(current, account) {
                    balance_diffs.push(diff);
                }
            }
        }
    }
    sort_by_title(&mut new_items, &mut balance_diffs);
    (new_items, balance_diffs)
}

fn balance_diff(current: &Account, incoming: &Account) -> Option<BalanceDiff> {
    if current.initial_amount_cents == incoming.initial_amount_cents {
        return None;
    }
    Some(BalanceDiff {
        title: incoming.title.clone(),
        current_balance: current.initial_amount_cents,
        new_balance: incoming.initial_amount_cents,
        diff: incoming
            .initial_amount_cents
            .saturating_sub(current.initial_amount_cents),
    })
}

fn sort_by_title(accounts: &mut [Account], diffs: &mut [BalanceDiff]) {
    accounts.sort_by(|a, b| a.title.cmp(&b.title));
    diffs.sort_by(|a, b| a.title.cmp(&b.title));
}

fn categories_by_id(live: &IdMap<Category>, incoming: &[Category]) -> Vec<Category> {
    let mut new_items: Vec<Category> = incoming
        .iter()
        .filter(|c| !c.is_deleted() && !live.contains(&c.id))
        .cloned()
        .collect();
    new_items.sort_by(|a, b| a.title.cmp(&b.title));
    new_items
}

fn categories_by_title(live: &[Category], incoming: &[Category]) -> Vec<Category> {
    let titles: HashSet<&str> = live.iter().map(|c| c.title.as_str()).collect();
    let mut new_items: Vec<Category> = incoming
        .iter()
        .filter(|c| !titles.contains(c.title.as_str()))
        .cloned()
        .collect();
    new_items.sort_by(|a, b| a.title.cmp(&b.title));
    new_items
}

/// Id-matched changes within the snapshot's most recent rows.
struct IdDelta<'a, R> {
    /// Snapshot rows whose id the store has never seen.
    added: Vec<&'a R>,
    /// Live rows a newer snapshot tombstone will delete.
    removed: Vec<&'a R>,
}

fn id_delta<'a, R: Versioned>(live: &'a IdMap<R>, incoming: &'a [R], limit: usize) -> IdDelta<'a, R> {
    let mut added = Vec::new();
    let mut removed = Vec::new();
    for row in most_recent(incoming, limit) {
        match live.get(row.id()) {
            None if !row.is_deleted() => added.push(row),
            Some(current) if row.is_deleted() && !current.is_deleted() && row.supersedes(current) => {
                removed.push(current)
            }
            _ => {}
        }
    }
    IdDelta { added, removed }
}

/// Newest first by `createdOn`, ties broken by id, tombstones included.
fn most_recent<R: Versioned>(rows: &[R], limit: usize) -> Vec<&R> {
    let mut sorted: Vec<&R> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        b.created_on()
            .cmp(&a.created_on())
            .then_with(|| a.id().cmp(b.id()))
    });
    sorted.truncate(limit);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermerge_core::{ids::*, records::*};

    fn account(id: &str, title: &str, cents: i64) -> Account {
        Account {
            id: AccountId::new(id),
            title: title.into(),
            initial_amount_cents: cents,
            is_included_in_total_balance: true,
            created_on: 10,
            deleted_on: None,
            currency_id: None,
            icon: None,
            hash_code: None,
        }
    }

    fn category(id: &str, title: &str) -> Category {
        Category {
            id: CategoryId::new(id),
            title: title.into(),
            category_type: CategoryType::Income,
            deleted_on: None,
        }
    }

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

    #[test]
    fn extreme_balances_saturate_instead_of_overflowing() {
        let diff = balance_diff(&account("A1", "Checking", i64::MIN), &account("A1", "Checking", i64::MAX))
            .unwrap();
        assert_eq!(diff.diff, i64::MAX);
        let diff = balance_diff(&account("A1", "Checking", i64::MAX), &account("A1", "Checking", i64::MIN))
            .unwrap();
        assert_eq!(diff.diff, i64::MIN);
    }

    #[test]
    fn date_range_ignores_tombstones() {
        let rows = vec![txn("T1", 300, None), txn("T2", 50, Some(60)), txn("T3", 100, None)];
        assert_eq!(
            DateRange::of(&rows),
            DateRange {
                earliest: Some(100),
                latest: Some(300)
            }
        );
        assert_eq!(DateRange::of::<Transaction>(&[]), DateRange::default());
    }

    #[test]
    fn detail_window_is_capped_to_most_recent_rows() {
        let incoming = LedgerRows {
            transactions: (0..150).map(|i| txn(&format!("T{i:03}"), i, None)).collect(),
            ..Default::default()
        };
        let options = DiffOptions::default();
        let report = compare(&LedgerRows::default(), &incoming, &options);

        assert_eq!(report.transactions.new, 150);
        assert_eq!(report.transactions.new_items.len(), DEFAULT_DETAIL_LIMIT);
        assert_eq!(report.transactions.new_items[0].id, TransactionId::new("T149"));
        assert_eq!(report.transactions.new_items[99].id, TransactionId::new("T050"));
    }

    #[test]
    fn tombstone_without_newer_clock_is_not_reported_deleted() {
        let live = LedgerRows {
            transactions: vec![txn("T1", 100, None), txn("T2", 100, None)],
            ..Default::default()
        };
        let incoming = LedgerRows {
            transactions: vec![txn("T1", 200, Some(200)), txn("T2", 100, Some(100))],
            ..Default::default()
        };
        let report = compare(&live, &incoming, &DiffOptions::default());
        let deleted: Vec<_> = report.transactions.deleted_items.iter().map(|t| t.id.clone()).collect();
        assert_eq!(deleted, vec![TransactionId::new("T1")]);
        assert!(report.transactions.new_items.is_empty());
        assert_eq!(report.transactions.current, 2);
        assert_eq!(report.transactions.new, 0);
    }

    #[test]
    fn strategies_disagree_on_renamed_account() {
        let live = LedgerRows {
            accounts: vec![account("A1", "Checking", 1000)],
            ..Default::default()
        };
        let incoming = LedgerRows {
            accounts: vec![account("A1", "Main checking", 1000)],
            ..Default::default()
        };

        let by_id = compare(&live, &incoming, &DiffOptions::default());
        assert!(by_id.accounts.new_items.is_empty());

        let by_title = compare(
            &live,
            &incoming,
            &DiffOptions {
                match_strategy: MatchStrategy::ByTitle,
                ..Default::default()
            },
        );
        assert_eq!(by_title.accounts.new_items.len(), 1);
        assert_eq!(by_title.accounts.new_items[0].title, "Main checking");
    }

    #[test]
    fn title_strategy_reports_balance_change_across_ids() {
        let live = LedgerRows {
            accounts: vec![account("A1", "Checking", 1000)],
            ..Default::default()
        };
        let incoming = LedgerRows {
            accounts: vec![account("B7", "Checking", 400)],
            ..Default::default()
        };
        let report = compare(
            &live,
            &incoming,
            &DiffOptions {
                match_strategy: MatchStrategy::ByTitle,
                ..Default::default()
            },
        );
        assert_eq!(
            report.accounts.balance_diffs,
            vec![BalanceDiff {
                title: "Checking".into(),
                current_balance: 1000,
                new_balance: 400,
                diff: -600,
            }]
        );
    }

    #[test]
    fn new_categories_sorted_by_title() {
        let live = LedgerRows {
            categories: vec![category("C1", "Salary")],
            ..Default::default()
        };
        let incoming = LedgerRows {
            categories: vec![category("C1", "Salary"), category("C3", "Rent"), category("C2", "Bonus")],
            ..Default::default()
        };
        let report = compare(&live, &incoming, &DiffOptions::default());
        let titles: Vec<_> = report.categories.new_items.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Bonus", "Rent"]);
        assert_eq!(report.categories.current, 1);
        assert_eq!(report.categories.new, 3);
    }

    #[test]
    fn report_json_uses_camel_case_keys() {
        let report = compare(&LedgerRows::default(), &LedgerRows::default(), &DiffOptions::default());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["accounts"]["current"], 0);
        assert!(json["accounts"]["balanceDiffs"].is_array());
        assert!(json["transactions"]["deletedItems"].is_array());
        assert!(json["transfers"]["newDateRange"]["latest"].is_null());
        assert!(json["categories"]["newItems"].is_array());
    }

    #[test]
    fn match_strategy_parses_config_values() {
        assert_eq!("id".parse::<MatchStrategy>().unwrap(), MatchStrategy::ById);
        assert_eq!(" Title ".parse::<MatchStrategy>().unwrap(), MatchStrategy::ByTitle);
        assert!("name".parse::<MatchStrategy>().is_err());
    }
}
