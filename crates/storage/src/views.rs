//! Read-only listings used by presentation clients.

use rusqlite::{Connection, params};

use ledgermerge_core::{
    entries::{TransactionEntry, TransferEntry},
    ids::*,
    records::{Account, Category, CategoryType},
};

use crate::error::StorageError;
use crate::rows;

pub fn list_accounts(conn: &Connection) -> Result<Vec<Account>, StorageError> {
    let mut accounts: Vec<Account> = rows::read_accounts(conn)?
        .into_iter()
        .filter(|a| a.deleted_on.is_none())
        .collect();
    accounts.sort_by(|a, b| a.title.cmp(&b.title));
    Ok(accounts)
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>, StorageError> {
    rows::read_categories(conn)
}

/// Non-deleted transactions on non-deleted accounts, newest first.
/// `note_filter` keeps rows whose note contains the text, ignoring case.
pub fn list_transactions(
    conn: &Connection,
    note_filter: Option<&str>,
) -> Result<Vec<TransactionEntry>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT transactions._id, transactions.createdOn,
                accounts._id, accounts.title, accounts.isIncludedInTotalBalance,
                categories._id, categories.title, categories.categoryType,
                transactions.amountCents, transactions.note
         FROM transactions
         JOIN accounts ON transactions.account_id = accounts._id
         JOIN categories ON transactions.category_id = categories._id
         WHERE transactions.deletedOn IS NULL
           AND accounts.deletedOn IS NULL
           AND (?1 IS NULL OR LOWER(transactions.note) LIKE '%' || LOWER(?1) || '%')
         ORDER BY transactions.createdOn DESC",
    )?;
    let rows = stmt.query_map(params![note_filter], |row| {
        let category_type: String = row.get(7)?;
        let entry = TransactionEntry {
            id: TransactionId::new(row.get::<_, String>(0)?),
            created_on: row.get(1)?,
            account_id: AccountId::new(row.get::<_, String>(2)?),
            account_name: Some(row.get(3)?),
            is_included_in_total_balance: Some(row.get(4)?),
            category_id: CategoryId::new(row.get::<_, String>(5)?),
            category_name: Some(row.get(6)?),
            category_type: None,
            amount_cents: row.get(8)?,
            note: row.get(9)?,
            deleted_on: None,
        };
        Ok((entry, category_type))
    })?;

    let mut result = Vec::new();
    for row in rows {
        let (mut entry, category_type) = row?;
        entry.category_type = Some(category_type.parse::<CategoryType>()?);
        result.push(entry);
    }
    Ok(result)
}

/// Non-deleted transfers, newest first.
pub fn list_transfers(conn: &Connection) -> Result<Vec<TransferEntry>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT transfers._id, transfers.createdOn,
                accountsFrom._id, accountsTo._id,
                accountsFrom.title, accountsTo.title,
                accountsFrom.isIncludedInTotalBalance, accountsTo.isIncludedInTotalBalance,
                transfers.amountCents, transfers.note
         FROM transfers
         JOIN accounts AS accountsFrom ON transfers.accountFrom = accountsFrom._id
         JOIN accounts AS accountsTo ON transfers.accountTo = accountsTo._id
         WHERE transfers.deletedOn IS NULL
         ORDER BY transfers.createdOn DESC",
    )?;
    let transfers = stmt
        .query_map([], |row| {
            Ok(TransferEntry {
                id: TransferId::new(row.get::<_, String>(0)?),
                created_on: row.get(1)?,
                account_from_id: AccountId::new(row.get::<_, String>(2)?),
                account_to_id: AccountId::new(row.get::<_, String>(3)?),
                account_from_name: Some(row.get(4)?),
                account_to_name: Some(row.get(5)?),
                account_from_is_included_in_total_balance: Some(row.get(6)?),
                account_to_is_included_in_total_balance: Some(row.get(7)?),
                amount_cents: row.get(8)?,
                note: row.get(9)?,
                deleted_on: None,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(transfers)
}
