//! Row codec shared by the live store and snapshot files.

use rusqlite::{Connection, params};

use ledgermerge_core::{
    ids::*,
    records::{Account, Category, CategoryType, LedgerRows, Transaction, Transfer},
};

use crate::error::StorageError;

pub fn read_all(conn: &Connection) -> Result<LedgerRows, StorageError> {
    Ok(LedgerRows {
        accounts: read_accounts(conn)?,
        categories: read_categories(conn)?,
        transactions: read_transactions(conn)?,
        transfers: read_transfers(conn)?,
    })
}

pub fn read_accounts(conn: &Connection) -> Result<Vec<Account>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT _id, title, initialAmountCents, isIncludedInTotalBalance, createdOn, deletedOn, currency_id, icon, hashCode FROM accounts",
    )?;
    let accounts = stmt
        .query_map([], |row| {
            Ok(Account {
                id: AccountId::new(row.get::<_, String>(0)?),
                title: row.get(1)?,
                initial_amount_cents: row.get(2)?,
                is_included_in_total_balance: row.get(3)?,
                created_on: row.get(4)?,
                deleted_on: row.get(5)?,
                currency_id: row.get(6)?,
                icon: row.get(7)?,
                hash_code: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(accounts)
}

pub fn read_categories(conn: &Connection) -> Result<Vec<Category>, StorageError> {
    let mut stmt = conn.prepare("SELECT _id, title, categoryType, deletedOn FROM categories")?;
    let rows = stmt.query_map([], |row| {
        let id: String = row.get(0)?;
        let title: String = row.get(1)?;
        let category_type: String = row.get(2)?;
        let deleted_on: Option<i64> = row.get(3)?;
        Ok((id, title, category_type, deleted_on))
    })?;

    let mut result = Vec::new();
    for row in rows {
        let (id, title, category_type, deleted_on) = row?;
        result.push(Category {
            id: CategoryId::new(id),
            title,
            category_type: category_type.parse::<CategoryType>()?,
            deleted_on,
        });
    }
    Ok(result)
}

pub fn read_transactions(conn: &Connection) -> Result<Vec<Transaction>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT _id, account_id, category_id, amountCents, createdOn, note, deletedOn FROM transactions",
    )?;
    let transactions = stmt
        .query_map([], |row| {
            Ok(Transaction {
                id: TransactionId::new(row.get::<_, String>(0)?),
                account_id: AccountId::new(row.get::<_, String>(1)?),
                category_id: CategoryId::new(row.get::<_, String>(2)?),
                amount_cents: row.get(3)?,
                created_on: row.get(4)?,
                note: row.get(5)?,
                deleted_on: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(transactions)
}

pub fn read_transfers(conn: &Connection) -> Result<Vec<Transfer>, StorageError> {
    let mut stmt = conn.prepare(
        "SELECT _id, accountFrom, accountTo, amountCents, createdOn, note, deletedOn FROM transfers",
    )?;
    let transfers = stmt
        .query_map([], |row| {
            Ok(Transfer {
                id: TransferId::new(row.get::<_, String>(0)?),
                account_from_id: AccountId::new(row.get::<_, String>(1)?),
                account_to_id: AccountId::new(row.get::<_, String>(2)?),
                amount_cents: row.get(3)?,
                created_on: row.get(4)?,
                note: row.get(5)?,
                deleted_on: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(transfers)
}

// Writers replace the whole row on id collision, never individual fields.

pub fn put_account(conn: &Connection, account: &Account) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO accounts (_id, title, initialAmountCents, isIncludedInTotalBalance, createdOn, deletedOn, currency_id, icon, hashCode) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(_id) DO UPDATE SET title = excluded.title, initialAmountCents = excluded.initialAmountCents, isIncludedInTotalBalance = excluded.isIncludedInTotalBalance, createdOn = excluded.createdOn, deletedOn = excluded.deletedOn, currency_id = excluded.currency_id, icon = excluded.icon, hashCode = excluded.hashCode",
        params![
            account.id.as_str(),
            account.title,
            account.initial_amount_cents,
            account.is_included_in_total_balance,
            account.created_on,
            account.deleted_on,
            account.currency_id,
            account.icon,
            account.hash_code,
        ],
    )?;
    Ok(())
}

pub fn put_category(conn: &Connection, category: &Category) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO categories (_id, title, categoryType, deletedOn) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(_id) DO UPDATE SET title = excluded.title, categoryType = excluded.categoryType, deletedOn = excluded.deletedOn",
        params![
            category.id.as_str(),
            category.title,
            category.category_type.as_str(),
            category.deleted_on,
        ],
    )?;
    Ok(())
}

pub fn put_transaction(conn: &Connection, txn: &Transaction) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO transactions (_id, account_id, category_id, amountCents, createdOn, note, deletedOn) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(_id) DO UPDATE SET account_id = excluded.account_id, category_id = excluded.category_id, amountCents = excluded.amountCents, createdOn = excluded.createdOn, note = excluded.note, deletedOn = excluded.deletedOn",
        params![
            txn.id.as_str(),
            txn.account_id.as_str(),
            txn.category_id.as_str(),
            txn.amount_cents,
            txn.created_on,
            txn.note,
            txn.deleted_on,
        ],
    )?;
    Ok(())
}

pub fn put_transfer(conn: &Connection, transfer: &Transfer) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO transfers (_id, accountFrom, accountTo, amountCents, createdOn, note, deletedOn) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(_id) DO UPDATE SET accountFrom = excluded.accountFrom, accountTo = excluded.accountTo, amountCents = excluded.amountCents, createdOn = excluded.createdOn, note = excluded.note, deletedOn = excluded.deletedOn",
        params![
            transfer.id.as_str(),
            transfer.account_from_id.as_str(),
            transfer.account_to_id.as_str(),
            transfer.amount_cents,
            transfer.created_on,
            transfer.note,
            transfer.deleted_on,
        ],
    )?;
    Ok(())
}
