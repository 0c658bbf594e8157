//! Account/privilege grant rows.
//!
//! # Invariants
//! - Grants are read back in insertion order (`account_privilege.rowid`).
//! - Reconciliation only touches the symmetric difference between the
//!   stored and requested sets; the intersection is never rewritten.

use super::privilege::resolve_names;
use crate::model::account::AccountId;
use crate::model::privilege::{Privilege, PrivilegeId};
use crate::repo::context::OpContext;
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::store::ReconcileSummary;
use crate::repo::translate::{ConstraintTranslator, SqliteConstraintTranslator, WriteContext};
use rusqlite::{params, Connection, Transaction};
use std::collections::BTreeSet;

const ENTITY: &str = "account_privilege";

/// Loads the privileges granted to one account.
pub(super) fn load_privileges(
    conn: &Connection,
    cx: &OpContext,
    account_id: AccountId,
) -> StoreResult<Vec<Privilege>> {
    cx.check()?;
    let mut stmt = conn
        .prepare(
            "SELECT p.id, p.name, p.description
             FROM account_privilege ap
             JOIN privilege p ON p.id = ap.privilege_id
             WHERE ap.account_id = ?1
             ORDER BY ap.rowid ASC;",
        )
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    let rows = stmt
        .query_map([account_id], |row| {
            Ok(Privilege {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        })
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|err| StoreError::backend(ENTITY, err))
}

fn current_grant_ids(
    conn: &Connection,
    cx: &OpContext,
    account_id: AccountId,
) -> StoreResult<Vec<PrivilegeId>> {
    cx.check()?;
    let mut stmt = conn
        .prepare(
            "SELECT privilege_id
             FROM account_privilege
             WHERE account_id = ?1
             ORDER BY rowid ASC;",
        )
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    let rows = stmt
        .query_map([account_id], |row| row.get(0))
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    rows.collect::<Result<Vec<_>, _>>()
        .map_err(|err| StoreError::backend(ENTITY, err))
}

/// Inserts one grant per privilege id, in slice order.
pub(super) fn insert_grants(
    tx: &Transaction<'_>,
    cx: &OpContext,
    translator: &SqliteConstraintTranslator,
    account_id: AccountId,
    privilege_ids: &[PrivilegeId],
) -> StoreResult<()> {
    for privilege_id in privilege_ids {
        cx.check()?;
        tx.execute(
            "INSERT INTO account_privilege (account_id, privilege_id) VALUES (?1, ?2);",
            params![account_id, privilege_id],
        )
        .map_err(|err| {
            let context = WriteContext::new(ENTITY)
                .value("account_id", account_id.to_string())
                .value("privilege_id", privilege_id.to_string())
                .ids([account_id]);
            translator.translate(err, &context)
        })?;
    }
    Ok(())
}

/// Computes grant changes needed to move from `current` to `target`.
///
/// `inserted` keeps `target` order, `removed` keeps `current` order, and
/// duplicates in either input are ignored.
pub fn diff_grants(current: &[PrivilegeId], target: &[PrivilegeId]) -> ReconcileSummary {
    let current_set: BTreeSet<PrivilegeId> = current.iter().copied().collect();
    let target_set: BTreeSet<PrivilegeId> = target.iter().copied().collect();

    let mut seen = BTreeSet::new();
    let inserted = target
        .iter()
        .copied()
        .filter(|id| !current_set.contains(id) && seen.insert(*id))
        .collect();
    let mut seen = BTreeSet::new();
    let removed = current
        .iter()
        .copied()
        .filter(|id| !target_set.contains(id) && seen.insert(*id))
        .collect();

    ReconcileSummary { inserted, removed }
}

/// Replaces the account's grant set with the privileges named in `names`.
///
/// Unknown names fail with `ReferentialConflict` before any grant changes.
pub(super) fn reconcile(
    tx: &Transaction<'_>,
    cx: &OpContext,
    translator: &SqliteConstraintTranslator,
    account_id: AccountId,
    names: &[String],
) -> StoreResult<ReconcileSummary> {
    let target: Vec<PrivilegeId> = resolve_names(tx, cx, names)?
        .into_iter()
        .map(|privilege| privilege.id)
        .collect();
    let current = current_grant_ids(tx, cx, account_id)?;
    let summary = diff_grants(&current, &target);

    for privilege_id in &summary.removed {
        cx.check()?;
        tx.execute(
            "DELETE FROM account_privilege WHERE account_id = ?1 AND privilege_id = ?2;",
            params![account_id, privilege_id],
        )
        .map_err(|err| {
            translator.translate(err, &WriteContext::new(ENTITY).ids([account_id]))
        })?;
    }
    insert_grants(tx, cx, translator, account_id, &summary.inserted)?;

    Ok(summary)
}
