//! Idempotent schema creation.
//!
//! # Responsibility
//! - Create the account/privilege/grant tables when missing.
//!
//! # Invariants
//! - Every statement is `IF NOT EXISTS`; running the bootstrap on an
//!   initialized database is a no-op.
//! - The grant table cascades deletes from `account` only.

use crate::db::DbResult;
use rusqlite::Connection;

const SCHEMA_SQL: &str = include_str!("0001_init.sql");

/// Tables every bootstrapped connection must expose.
pub const REQUIRED_TABLES: &[&str] = &["account", "privilege", "account_privilege"];

/// Applies the schema inside one transaction.
pub fn ensure_schema(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(SCHEMA_SQL)?;
    tx.commit()?;
    Ok(())
}

/// Returns whether `table` exists in the connected database.
pub fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
