use rusqlite::Connection;

use crate::error::StorageError;

pub const SCHEMA_VERSION: i32 = 1;

/// Tables a ledger file must contain to be usable as a store or snapshot.
pub const LEDGER_TABLES: [&str; 4] = ["accounts", "categories", "transactions", "transfers"];

pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
    ",
    )?;
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, unixepoch())",
        [SCHEMA_VERSION],
    )?;
    Ok(())
}

/// Highest schema version recorded in the database.
pub fn schema_version(conn: &Connection) -> Result<i32, StorageError> {
    let version = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })?;
    Ok(version)
}

/// Names from `LEDGER_TABLES` that are absent from the database behind `conn`.
pub fn missing_tables(conn: &Connection) -> Result<Vec<&'static str>, StorageError> {
    let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LEDGER_TABLES
        .iter()
        .copied()
        .filter(|t| !present.iter().any(|p| p == t))
        .collect())
}

// Column names follow the mobile app's export so snapshots and the store
// share one row codec. No foreign keys: dangling references are stored as-is.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    _id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    initialAmountCents INTEGER NOT NULL DEFAULT 0,
    isIncludedInTotalBalance INTEGER NOT NULL DEFAULT 1,
    createdOn INTEGER NOT NULL,
    deletedOn INTEGER,
    currency_id INTEGER,
    icon TEXT,
    hashCode INTEGER
);

CREATE TABLE IF NOT EXISTS categories (
    _id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    categoryType TEXT NOT NULL CHECK (categoryType IN ('Income', 'Expense')),
    deletedOn INTEGER
);

CREATE TABLE IF NOT EXISTS transactions (
    _id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL,
    category_id TEXT NOT NULL,
    amountCents INTEGER NOT NULL,
    createdOn INTEGER NOT NULL,
    note TEXT,
    deletedOn INTEGER
);
CREATE INDEX IF NOT EXISTS idx_transactions_created ON transactions (createdOn);

CREATE TABLE IF NOT EXISTS transfers (
    _id TEXT PRIMARY KEY,
    accountFrom TEXT NOT NULL,
    accountTo TEXT NOT NULL,
    amountCents INTEGER NOT NULL,
    createdOn INTEGER NOT NULL,
    note TEXT,
    deletedOn INTEGER
);
CREATE INDEX IF NOT EXISTS idx_transfers_created ON transfers (createdOn);
";
