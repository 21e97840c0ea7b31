use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::*;

/// A ledger row that can be keyed by id and carries a tombstone.
pub trait Record: Clone {
    type Id: Clone + Eq + Hash + Ord + fmt::Display;

    fn id(&self) -> &Self::Id;

    fn deleted_on(&self) -> Option<i64>;

    fn is_deleted(&self) -> bool {
        self.deleted_on().is_some()
    }
}

/// A record whose `created_on` doubles as its version clock.
pub trait Versioned: Record {
    fn created_on(&self) -> i64;

    /// True when `self` is strictly newer than `other` and should replace it.
    fn supersedes(&self, other: &Self) -> bool {
        self.created_on() > other.created_on()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: AccountId,
    pub title: String,
    pub initial_amount_cents: i64,
    pub is_included_in_total_balance: bool,
    pub created_on: i64,
    pub deleted_on: Option<i64>,
    #[serde(rename = "currency_id")]
    pub currency_id: Option<i64>,
    pub icon: Option<String>,
    pub hash_code: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryType {
    Income,
    Expense,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "Income",
            Self::Expense => "Expense",
        }
    }
}

impl FromStr for CategoryType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Income" => Ok(Self::Income),
            "Expense" => Ok(Self::Expense),
            other => Err(CoreError::UnknownCategoryType(other.to_string())),
        }
    }
}

impl fmt::Display for CategoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categories carry no version clock; see `Record` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: CategoryId,
    pub title: String,
    pub category_type: CategoryType,
    pub deleted_on: Option<i64>,
}

/// Amounts are integer minor units; the display value is `amount_cents / 1000`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: TransactionId,
    pub account_id: AccountId,
    pub category_id: CategoryId,
    pub amount_cents: i64,
    pub created_on: i64,
    pub note: Option<String>,
    pub deleted_on: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    #[serde(rename = "_id")]
    pub id: TransferId,
    pub account_from_id: AccountId,
    pub account_to_id: AccountId,
    pub amount_cents: i64,
    pub created_on: i64,
    pub note: Option<String>,
    pub deleted_on: Option<i64>,
}

macro_rules! impl_record {
    ($ty:ty, $id:ty) => {
        impl Record for $ty {
            type Id = $id;

            fn id(&self) -> &$id {
                &self.id
            }

            fn deleted_on(&self) -> Option<i64> {
                self.deleted_on
            }
        }
    };
}

impl_record!(Account, AccountId);
impl_record!(Category, CategoryId);
impl_record!(Transaction, TransactionId);
impl_record!(Transfer, TransferId);

impl Versioned for Account {
    fn created_on(&self) -> i64 {
        self.created_on
    }
}

impl Versioned for Transaction {
    fn created_on(&self) -> i64 {
        self.created_on
    }
}

impl Versioned for Transfer {
    fn created_on(&self) -> i64 {
        self.created_on
    }
}

/// Non-deleted row counts per entity type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub accounts: usize,
    pub categories: usize,
    pub transactions: usize,
    pub transfers: usize,
}

/// Every row of every entity type from one ledger, tombstones included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerRows {
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
    pub transfers: Vec<Transfer>,
}

impl LedgerRows {
    pub fn live_counts(&self) -> EntityCounts {
        EntityCounts {
            accounts: count_live(&self.accounts),
            categories: count_live(&self.categories),
            transactions: count_live(&self.transactions),
            transfers: count_live(&self.transfers),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
            && self.categories.is_empty()
            && self.transactions.is_empty()
            && self.transfers.is_empty()
    }
}

fn count_live<R: Record>(rows: &[R]) -> usize {
    rows.iter().filter(|r| !r.is_deleted()).count()
}
