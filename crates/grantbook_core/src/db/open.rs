//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure connection pragmas required by the store.
//! - Retry transient open failures with bounded linear backoff.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have the schema applied.

use super::schema::ensure_schema;
use super::{DbError, DbResult};
use crate::config::{DatabaseUrl, StoreConfig};
use log::{error, info, warn};
use rusqlite::{Connection, ErrorCode};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file and creates the schema.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    open_with("file", || Connection::open(path))
}

/// Opens an in-memory SQLite database and creates the schema.
pub fn open_db_in_memory() -> DbResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

/// Opens the configured database, retrying transient failures.
///
/// Attempts `1 + config.connect_retries` times, sleeping
/// `retry_backoff * attempt` between tries. Non-transient failures are
/// returned immediately.
pub fn connect(config: &StoreConfig) -> DbResult<Connection> {
    let max_attempts = config.connect_retries.saturating_add(1);
    let mut attempt = 0_u32;
    loop {
        attempt += 1;
        let result = match &config.database {
            DatabaseUrl::Memory => open_db_in_memory(),
            DatabaseUrl::File(path) => open_db(path),
        };
        match result {
            Ok(conn) => return Ok(conn),
            Err(DbError::Sqlite(err)) if attempt < max_attempts && is_transient(&err) => {
                let backoff = config.retry_backoff * attempt;
                warn!(
                    "event=db_connect module=db status=retry attempt={} max_attempts={} backoff_ms={} error={}",
                    attempt,
                    max_attempts,
                    backoff.as_millis(),
                    err
                );
                std::thread::sleep(backoff);
            }
            Err(DbError::Sqlite(err)) => {
                return Err(DbError::ConnectFailed {
                    attempts: attempt,
                    source: err,
                })
            }
            Err(other) => return Err(other),
        }
    }
}

fn open_with<F>(mode: &'static str, opener: F) -> DbResult<Connection>
where
    F: FnOnce() -> rusqlite::Result<Connection>,
{
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = match opener() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    ensure_schema(conn)?;
    Ok(())
}

fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen)
    )
}
