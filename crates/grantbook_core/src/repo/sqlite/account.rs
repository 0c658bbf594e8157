//! Account rows and their write paths.
//!
//! # Invariants
//! - Batch inserts resolve every requested privilege by name; an unknown
//!   name fails the batch.
//! - Updates write present scalar fields with a single `UPDATE` and require
//!   exactly one affected row.
//! - Credentials never enter a `WriteContext`, so they cannot surface in
//!   translated errors.

use super::delete_rows;
use super::grant::{insert_grants, load_privileges, reconcile};
use super::privilege::resolve_names;
use crate::credential::Credential;
use crate::model::account::{
    Account, AccountId, AccountPatch, AccountPrivileges, Field, NewAccount,
};
use crate::model::filter::AccountFilter;
use crate::model::privilege::Privilege;
use crate::repo::context::OpContext;
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::query::QueryBuilder;
use crate::repo::store::{Page, ReconcileSummary};
use crate::repo::translate::{ConstraintTranslator, SqliteConstraintTranslator, WriteContext};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

pub(super) const ENTITY: &str = "account";
const SELECT_ACCOUNT: &str = "SELECT id, name, email, credential FROM account";

/// Single-row lookup key.
#[derive(Debug, Clone, Copy)]
pub(super) enum AccountKey<'a> {
    Id(AccountId),
    Name(&'a str),
    Email(&'a str),
}

impl AccountKey<'_> {
    fn column(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Name(_) => "name",
            Self::Email(_) => "email",
        }
    }

    fn value(&self) -> Value {
        match self {
            Self::Id(id) => Value::Integer(*id),
            Self::Name(value) | Self::Email(value) => Value::Text((*value).to_string()),
        }
    }
}

impl Display for AccountKey<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Name(name) => write!(f, "name={name}"),
            Self::Email(email) => write!(f, "email={email}"),
        }
    }
}

fn map_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        credential: Credential::from_encoded(row.get::<_, String>(3)?),
        privileges: AccountPrivileges::NotLoaded,
    })
}

/// Loads one account with its privilege relation.
pub(super) fn get_account(
    conn: &Connection,
    cx: &OpContext,
    key: AccountKey<'_>,
) -> StoreResult<Account> {
    cx.check()?;
    let sql = format!("{SELECT_ACCOUNT} WHERE {} = ?1;", key.column());
    let mut account = conn
        .query_row(&sql, [key.value()], map_account_row)
        .optional()
        .map_err(|err| StoreError::backend(ENTITY, err))?
        .ok_or_else(|| StoreError::not_found(ENTITY, key))?;
    account.privileges = AccountPrivileges::Loaded(load_privileges(conn, cx, account.id)?);
    Ok(account)
}

pub(super) fn account_exists(
    conn: &Connection,
    cx: &OpContext,
    id: AccountId,
) -> StoreResult<bool> {
    cx.check()?;
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM account WHERE id = ?1);",
            [id],
            |row| row.get(0),
        )
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    Ok(exists == 1)
}

/// Counts matches, then loads one page ordered by id.
pub(super) fn find_accounts(
    conn: &Connection,
    cx: &OpContext,
    filter: &AccountFilter,
    offset: i64,
    limit: i64,
) -> StoreResult<Page<Account>> {
    let builder = QueryBuilder::new()
        .id("id", &filter.id)
        .text("name", &filter.name)
        .text("email", &filter.email);

    cx.check()?;
    let total: i64 = conn
        .query_row(
            &builder.append_where("SELECT COUNT(id) FROM account"),
            params_from_iter(builder.args().iter()),
            |row| row.get(0),
        )
        .map_err(|err| StoreError::backend(ENTITY, err))?;

    cx.check()?;
    let (sql, args) = builder.select_page(SELECT_ACCOUNT, "id ASC", offset, limit);
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), map_account_row)
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    let items = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| StoreError::backend(ENTITY, err))?;

    Ok(Page {
        items,
        total: u64::try_from(total).unwrap_or_default(),
    })
}

pub(super) fn insert_accounts(
    tx: &Transaction<'_>,
    cx: &OpContext,
    translator: &SqliteConstraintTranslator,
    accounts: Vec<NewAccount>,
) -> StoreResult<Vec<Account>> {
    let mut created = Vec::with_capacity(accounts.len());
    for account in accounts {
        cx.check()?;
        tx.execute(
            "INSERT INTO account (name, email, credential) VALUES (?1, ?2, ?3);",
            params![account.name, account.email, account.credential.as_str()],
        )
        .map_err(|err| {
            let context = WriteContext::new(ENTITY)
                .value("name", account.name.as_str())
                .value("email", account.email.as_str());
            translator.translate(err, &context)
        })?;
        let id = tx.last_insert_rowid();

        let names = dedup_names(&account.privileges);
        let privileges = resolve_names(tx, cx, &names)?;
        let privilege_ids = privileges.iter().map(|p| p.id).collect::<Vec<_>>();
        insert_grants(tx, cx, translator, id, &privilege_ids)?;

        created.push(Account {
            id,
            name: account.name,
            email: account.email,
            credential: account.credential,
            privileges: AccountPrivileges::Loaded(privileges),
        });
    }
    Ok(created)
}

/// Applies present scalar fields, then reconciles grants when requested.
pub(super) fn update_account(
    tx: &Transaction<'_>,
    cx: &OpContext,
    translator: &SqliteConstraintTranslator,
    patch: &AccountPatch,
) -> StoreResult<ReconcileSummary> {
    if patch.has_scalar_changes() {
        let mut assignments = Vec::new();
        let mut args = Vec::new();
        let mut context = WriteContext::new(ENTITY).ids([patch.id]);
        if let Field::Present(name) = &patch.name {
            assignments.push("name = ?");
            args.push(Value::Text(name.clone()));
            context = context.value("name", name.as_str());
        }
        if let Field::Present(email) = &patch.email {
            assignments.push("email = ?");
            args.push(Value::Text(email.clone()));
            context = context.value("email", email.as_str());
        }
        if let Field::Present(credential) = &patch.credential {
            assignments.push("credential = ?");
            args.push(Value::Text(credential.as_str().to_string()));
        }
        args.push(Value::Integer(patch.id));

        cx.check()?;
        let sql = format!("UPDATE account SET {} WHERE id = ?;", assignments.join(", "));
        let changed = tx
            .execute(&sql, params_from_iter(args.iter()))
            .map_err(|err| translator.translate(err, &context))?;
        if changed != 1 {
            return Err(StoreError::not_found(ENTITY, AccountKey::Id(patch.id)));
        }
    } else if !account_exists(tx, cx, patch.id)? {
        return Err(StoreError::not_found(ENTITY, AccountKey::Id(patch.id)));
    }

    match &patch.privileges {
        Field::Present(names) => reconcile(tx, cx, translator, patch.id, &dedup_names(names)),
        Field::Absent => Ok(ReconcileSummary::default()),
    }
}

pub(super) fn delete_accounts(
    tx: &Transaction<'_>,
    cx: &OpContext,
    translator: &SqliteConstraintTranslator,
    ids: &[AccountId],
) -> StoreResult<()> {
    delete_rows(tx, cx, translator, ENTITY, ids)
}

pub(super) fn account_privileges(
    conn: &Connection,
    cx: &OpContext,
    account_id: AccountId,
) -> StoreResult<Vec<Privilege>> {
    if !account_exists(conn, cx, account_id)? {
        return Err(StoreError::not_found(ENTITY, AccountKey::Id(account_id)));
    }
    load_privileges(conn, cx, account_id)
}

/// First occurrence wins; order is otherwise preserved.
fn dedup_names(names: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{dedup_names, AccountKey};

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let names = ["User", "Admin", "User", "Guest", "Admin"]
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>();
        assert_eq!(dedup_names(&names), vec!["User", "Admin", "Guest"]);
    }

    #[test]
    fn key_renders_column_and_value() {
        assert_eq!(AccountKey::Id(4).to_string(), "id=4");
        assert_eq!(AccountKey::Email("demo@foo.com").to_string(), "email=demo@foo.com");
    }
}
