//! SQLite implementation of `AccountStore`.
//!
//! # Responsibility
//! - Serialize access to one connection and run each operation to
//!   completion (commit or rollback) before releasing it.
//! - Emit one structured log line per operation.
//!
//! # Invariants
//! - The connection lock is held for exactly one operation.
//! - Writes run in an `IMMEDIATE` transaction; any error, including a fired
//!   `OpContext`, drops the transaction and rolls it back.
//! - Log lines carry entity and error code only, never field values.

mod account;
mod grant;
mod privilege;

pub use grant::diff_grants;

use self::account::AccountKey;
use self::privilege::PrivilegeKey;
use crate::config::StoreConfig;
use crate::db;
use crate::model::account::{Account, AccountId, AccountPatch, NewAccount};
use crate::model::filter::{AccountFilter, PrivilegeFilter};
use crate::model::privilege::{NewPrivilege, Privilege, PrivilegeId};
use crate::repo::context::OpContext;
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::store::{AccountStore, Page, ReconcileSummary};
use crate::repo::translate::{ConstraintTranslator, SqliteConstraintTranslator, WriteContext};
use log::{debug, error, info, warn};
use rusqlite::{params_from_iter, Connection, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

pub const BACKEND_NAME: &str = "sqlite";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpKind {
    Read,
    Write,
}

/// SQLite-backed account store owning one bootstrapped connection.
pub struct SqliteAccountStore {
    conn: Mutex<Connection>,
    max_limit: u32,
    translator: SqliteConstraintTranslator,
}

impl SqliteAccountStore {
    /// Wraps a connection that already has the schema applied.
    ///
    /// Use `db::open_db`/`db::open_db_in_memory` to obtain one.
    pub fn new(conn: Connection, max_limit: u32) -> Self {
        Self {
            conn: Mutex::new(conn),
            max_limit: max_limit.max(1),
            translator: SqliteConstraintTranslator,
        }
    }

    /// Connects with the configured retry policy and bootstraps the schema.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let conn = db::connect(config)?;
        Ok(Self::new(conn, config.max_limit))
    }

    /// Fresh in-memory store; mostly for tests and one-shot tooling.
    pub fn open_in_memory(max_limit: u32) -> StoreResult<Self> {
        let conn = db::open_db_in_memory()?;
        Ok(Self::new(conn, max_limit))
    }

    fn with_conn<T>(&self, op: impl FnOnce(&mut Connection) -> StoreResult<T>) -> StoreResult<T> {
        // A panic mid-operation drops its transaction, so the connection is
        // still consistent after poisoning.
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut guard)
    }

    fn read<T>(
        &self,
        cx: &OpContext,
        event: &'static str,
        op: impl FnOnce(&Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let started_at = Instant::now();
        let result = self.with_conn(|conn| {
            cx.check()?;
            op(conn)
        });
        record(event, OpKind::Read, started_at, &result);
        result
    }

    fn write<T>(
        &self,
        cx: &OpContext,
        entity: &'static str,
        event: &'static str,
        op: impl FnOnce(&Transaction<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let started_at = Instant::now();
        let result = self.with_conn(|conn| {
            cx.check()?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|err| StoreError::backend(entity, err))?;
            let value = op(&tx)?;
            cx.check()?;
            tx.commit().map_err(|err| StoreError::backend(entity, err))?;
            Ok(value)
        });
        record(event, OpKind::Write, started_at, &result);
        result
    }

    fn page_bounds(&self, offset: u64, limit: u32) -> StoreResult<(i64, i64)> {
        validate_page(offset, limit, self.max_limit)
    }
}

impl AccountStore for SqliteAccountStore {
    fn backend(&self) -> &'static str {
        BACKEND_NAME
    }

    fn max_limit(&self) -> u32 {
        self.max_limit
    }

    fn get_account(&self, cx: &OpContext, id: AccountId) -> StoreResult<Account> {
        self.read(cx, "account_get", |conn| {
            account::get_account(conn, cx, AccountKey::Id(id))
        })
    }

    fn get_account_by_name(&self, cx: &OpContext, name: &str) -> StoreResult<Account> {
        self.read(cx, "account_get", |conn| {
            account::get_account(conn, cx, AccountKey::Name(name))
        })
    }

    fn get_account_by_email(&self, cx: &OpContext, email: &str) -> StoreResult<Account> {
        self.read(cx, "account_get", |conn| {
            account::get_account(conn, cx, AccountKey::Email(email))
        })
    }

    fn find_accounts(
        &self,
        cx: &OpContext,
        filter: &AccountFilter,
        offset: u64,
        limit: u32,
    ) -> StoreResult<Page<Account>> {
        self.read(cx, "account_find", |conn| {
            let (offset, limit) = self.page_bounds(offset, limit)?;
            account::find_accounts(conn, cx, filter, offset, limit)
        })
    }

    fn add_accounts(&self, cx: &OpContext, accounts: Vec<NewAccount>) -> StoreResult<Vec<Account>> {
        self.write(cx, account::ENTITY, "account_add", |tx| {
            account::insert_accounts(tx, cx, &self.translator, accounts)
        })
    }

    fn update_account(&self, cx: &OpContext, patch: AccountPatch) -> StoreResult<ReconcileSummary> {
        self.write(cx, account::ENTITY, "account_update", |tx| {
            account::update_account(tx, cx, &self.translator, &patch)
        })
    }

    fn delete_accounts(&self, cx: &OpContext, ids: &[AccountId]) -> StoreResult<()> {
        self.write(cx, account::ENTITY, "account_delete", |tx| {
            account::delete_accounts(tx, cx, &self.translator, ids)
        })
    }

    fn account_privileges(
        &self,
        cx: &OpContext,
        account_id: AccountId,
    ) -> StoreResult<Vec<Privilege>> {
        self.read(cx, "account_privileges", |conn| {
            account::account_privileges(conn, cx, account_id)
        })
    }

    fn get_privilege(&self, cx: &OpContext, id: PrivilegeId) -> StoreResult<Privilege> {
        self.read(cx, "privilege_get", |conn| {
            privilege::get_privilege(conn, cx, PrivilegeKey::Id(id))
        })
    }

    fn get_privilege_by_name(&self, cx: &OpContext, name: &str) -> StoreResult<Privilege> {
        self.read(cx, "privilege_get", |conn| {
            privilege::get_privilege(conn, cx, PrivilegeKey::Name(name))
        })
    }

    fn find_privileges(
        &self,
        cx: &OpContext,
        filter: &PrivilegeFilter,
        offset: u64,
        limit: u32,
    ) -> StoreResult<Page<Privilege>> {
        self.read(cx, "privilege_find", |conn| {
            let (offset, limit) = self.page_bounds(offset, limit)?;
            privilege::find_privileges(conn, cx, filter, offset, limit)
        })
    }

    fn add_privileges(
        &self,
        cx: &OpContext,
        privileges: Vec<NewPrivilege>,
    ) -> StoreResult<Vec<Privilege>> {
        self.write(cx, privilege::ENTITY, "privilege_add", |tx| {
            privilege::insert_privileges(tx, cx, &self.translator, privileges)
        })
    }

    fn delete_privileges(&self, cx: &OpContext, ids: &[PrivilegeId]) -> StoreResult<()> {
        self.write(cx, privilege::ENTITY, "privilege_delete", |tx| {
            privilege::delete_privileges(tx, cx, &self.translator, ids)
        })
    }
}

/// Converts caller paging input into SQLite integer bounds.
fn validate_page(offset: u64, limit: u32, max_limit: u32) -> StoreResult<(i64, i64)> {
    if limit == 0 || limit > max_limit {
        return Err(StoreError::Validation(format!(
            "limit must be between 1 and {max_limit}, got {limit}"
        )));
    }
    let offset = i64::try_from(offset)
        .map_err(|_| StoreError::Validation(format!("offset out of range: {offset}")))?;
    Ok((offset, i64::from(limit)))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Deletes every id in `ids` from `entity`'s table, or nothing.
///
/// `entity` doubles as the table name. Repeated ids cannot all be affected,
/// so they fail the affected-row check like a missing id would.
fn delete_rows(
    tx: &Transaction<'_>,
    cx: &OpContext,
    translator: &SqliteConstraintTranslator,
    entity: &'static str,
    ids: &[i64],
) -> StoreResult<()> {
    if ids.is_empty() {
        return Err(StoreError::Validation(format!(
            "{entity} delete requires at least one id"
        )));
    }
    let distinct = ids.iter().copied().collect::<BTreeSet<i64>>();
    let in_clause = placeholders(distinct.len());

    cx.check()?;
    let mut stmt = tx
        .prepare(&format!("SELECT id FROM {entity} WHERE id IN ({in_clause});"))
        .map_err(|err| StoreError::backend(entity, err))?;
    let rows = stmt
        .query_map(params_from_iter(distinct.iter()), |row| row.get::<_, i64>(0))
        .map_err(|err| StoreError::backend(entity, err))?;
    let existing = rows
        .collect::<Result<BTreeSet<_>, _>>()
        .map_err(|err| StoreError::backend(entity, err))?;
    let missing = distinct
        .difference(&existing)
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(StoreError::not_found(entity, missing.join(", ")));
    }

    cx.check()?;
    let deleted = tx
        .execute(
            &format!("DELETE FROM {entity} WHERE id IN ({in_clause});"),
            params_from_iter(distinct.iter()),
        )
        .map_err(|err| translator.translate(err, &WriteContext::new(entity).ids(&distinct)))?;
    if deleted != ids.len() {
        let requested = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        return Err(StoreError::not_found(entity, requested.join(", ")));
    }
    Ok(())
}

fn record<T>(event: &'static str, kind: OpKind, started_at: Instant, result: &StoreResult<T>) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) if kind == OpKind::Write => info!(
            "event={} module=store status=ok backend={} duration_ms={}",
            event, BACKEND_NAME, duration_ms
        ),
        Ok(_) => debug!(
            "event={} module=store status=ok backend={} duration_ms={}",
            event, BACKEND_NAME, duration_ms
        ),
        Err(err) if err.is_client_error() || matches!(err, StoreError::Cancelled(_)) => warn!(
            "event={} module=store status=error backend={} duration_ms={} error_code={}",
            event,
            BACKEND_NAME,
            duration_ms,
            err.code()
        ),
        Err(err) => error!(
            "event={} module=store status=error backend={} duration_ms={} error_code={}",
            event,
            BACKEND_NAME,
            duration_ms,
            err.code()
        ),
    }
}
