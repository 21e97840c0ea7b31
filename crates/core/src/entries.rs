use serde::{Deserialize, Serialize};

use crate::id_map::IdMap;
use crate::ids::*;
use crate::records::{Account, Category, CategoryType, Transaction, Transfer};

/// A transaction joined with the names of the account and category it points at.
/// Names are `None` when a foreign key does not resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEntry {
    #[serde(rename = "_id")]
    pub id: TransactionId,
    pub created_on: i64,
    pub account_id: AccountId,
    pub account_name: Option<String>,
    pub is_included_in_total_balance: Option<bool>,
    pub category_id: CategoryId,
    pub category_name: Option<String>,
    pub category_type: Option<CategoryType>,
    pub amount_cents: i64,
    pub note: Option<String>,
    pub deleted_on: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEntry {
    #[serde(rename = "_id")]
    pub id: TransferId,
    pub created_on: i64,
    pub account_from_id: AccountId,
    pub account_to_id: AccountId,
    pub account_from_name: Option<String>,
    pub account_to_name: Option<String>,
    pub account_from_is_included_in_total_balance: Option<bool>,
    pub account_to_is_included_in_total_balance: Option<bool>,
    pub amount_cents: i64,
    pub note: Option<String>,
    pub deleted_on: Option<i64>,
}

impl TransactionEntry {
    pub fn join(txn: &Transaction, accounts: &IdMap<Account>, categories: &IdMap<Category>) -> Self {
        let account = accounts.get(&txn.account_id);
        let category = categories.get(&txn.category_id);
        Self {
            id: txn.id.clone(),
            created_on: txn.created_on,
            account_id: txn.account_id.clone(),
            account_name: account.map(|a| a.title.clone()),
            is_included_in_total_balance: account.map(|a| a.is_included_in_total_balance),
            category_id: txn.category_id.clone(),
            category_name: category.map(|c| c.title.clone()),
            category_type: category.map(|c| c.category_type),
            amount_cents: txn.amount_cents,
            note: txn.note.clone(),
            deleted_on: txn.deleted_on,
        }
    }
}

impl TransferEntry {
    pub fn join(transfer: &Transfer, accounts: &IdMap<Account>) -> Self {
        let from = accounts.get(&transfer.account_from_id);
        let to = accounts.get(&transfer.account_to_id);
        Self {
            id: transfer.id.clone(),
            created_on: transfer.created_on,
            account_from_id: transfer.account_from_id.clone(),
            account_to_id: transfer.account_to_id.clone(),
            account_from_name: from.map(|a| a.title.clone()),
            account_to_name: to.map(|a| a.title.clone()),
            account_from_is_included_in_total_balance: from.map(|a| a.is_included_in_total_balance),
            account_to_is_included_in_total_balance: to.map(|a| a.is_included_in_total_balance),
            amount_cents: transfer.amount_cents,
            note: transfer.note.clone(),
            deleted_on: transfer.deleted_on,
        }
    }
}
