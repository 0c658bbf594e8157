//! Privilege rows.

use super::{delete_rows, placeholders};
use crate::model::filter::PrivilegeFilter;
use crate::model::privilege::{NewPrivilege, Privilege, PrivilegeId};
use crate::repo::context::OpContext;
use crate::repo::error::{StoreError, StoreResult};
use crate::repo::query::QueryBuilder;
use crate::repo::store::Page;
use crate::repo::translate::{ConstraintTranslator, SqliteConstraintTranslator, WriteContext};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

pub(super) const ENTITY: &str = "privilege";
const SELECT_PRIVILEGE: &str = "SELECT id, name, description FROM privilege";

/// Single-row lookup key.
#[derive(Debug, Clone, Copy)]
pub(super) enum PrivilegeKey<'a> {
    Id(PrivilegeId),
    Name(&'a str),
}

impl PrivilegeKey<'_> {
    fn column(&self) -> &'static str {
        match self {
            Self::Id(_) => "id",
            Self::Name(_) => "name",
        }
    }

    fn value(&self) -> Value {
        match self {
            Self::Id(id) => Value::Integer(*id),
            Self::Name(name) => Value::Text((*name).to_string()),
        }
    }
}

impl Display for PrivilegeKey<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id={id}"),
            Self::Name(name) => write!(f, "name={name}"),
        }
    }
}

fn map_privilege_row(row: &Row<'_>) -> rusqlite::Result<Privilege> {
    Ok(Privilege {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

pub(super) fn get_privilege(
    conn: &Connection,
    cx: &OpContext,
    key: PrivilegeKey<'_>,
) -> StoreResult<Privilege> {
    cx.check()?;
    let sql = format!("{SELECT_PRIVILEGE} WHERE {} = ?1;", key.column());
    conn.query_row(&sql, [key.value()], map_privilege_row)
        .optional()
        .map_err(|err| StoreError::backend(ENTITY, err))?
        .ok_or_else(|| StoreError::not_found(ENTITY, key))
}

pub(super) fn find_privileges(
    conn: &Connection,
    cx: &OpContext,
    filter: &PrivilegeFilter,
    offset: i64,
    limit: i64,
) -> StoreResult<Page<Privilege>> {
    let builder = QueryBuilder::new()
        .id("id", &filter.id)
        .text("name", &filter.name)
        .text("description", &filter.description);

    cx.check()?;
    let total: i64 = conn
        .query_row(
            &builder.append_where("SELECT COUNT(id) FROM privilege"),
            params_from_iter(builder.args().iter()),
            |row| row.get(0),
        )
        .map_err(|err| StoreError::backend(ENTITY, err))?;

    cx.check()?;
    let (sql, args) = builder.select_page(SELECT_PRIVILEGE, "id ASC", offset, limit);
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    let rows = stmt
        .query_map(params_from_iter(args.iter()), map_privilege_row)
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    let items = rows
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| StoreError::backend(ENTITY, err))?;

    Ok(Page {
        items,
        total: u64::try_from(total).unwrap_or_default(),
    })
}

pub(super) fn insert_privileges(
    tx: &Transaction<'_>,
    cx: &OpContext,
    translator: &SqliteConstraintTranslator,
    privileges: Vec<NewPrivilege>,
) -> StoreResult<Vec<Privilege>> {
    let mut created = Vec::with_capacity(privileges.len());
    for privilege in privileges {
        cx.check()?;
        tx.execute(
            "INSERT INTO privilege (name, description) VALUES (?1, ?2);",
            params![privilege.name, privilege.description],
        )
        .map_err(|err| {
            let context = WriteContext::new(ENTITY).value("name", privilege.name.as_str());
            translator.translate(err, &context)
        })?;
        created.push(Privilege {
            id: tx.last_insert_rowid(),
            name: privilege.name,
            description: privilege.description,
        });
    }
    Ok(created)
}

pub(super) fn delete_privileges(
    tx: &Transaction<'_>,
    cx: &OpContext,
    translator: &SqliteConstraintTranslator,
    ids: &[PrivilegeId],
) -> StoreResult<()> {
    delete_rows(tx, cx, translator, ENTITY, ids)
}

/// Resolves privilege names to rows, preserving `names` order.
///
/// Every unknown name is reported in one `ReferentialConflict`.
pub(super) fn resolve_names(
    conn: &Connection,
    cx: &OpContext,
    names: &[String],
) -> StoreResult<Vec<Privilege>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }

    cx.check()?;
    let sql = format!(
        "{SELECT_PRIVILEGE} WHERE name IN ({});",
        placeholders(names.len())
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    let rows = stmt
        .query_map(params_from_iter(names.iter()), map_privilege_row)
        .map_err(|err| StoreError::backend(ENTITY, err))?;
    let mut by_name = HashMap::new();
    for row in rows {
        let privilege = row.map_err(|err| StoreError::backend(ENTITY, err))?;
        by_name.insert(privilege.name.clone(), privilege);
    }

    let mut resolved = Vec::with_capacity(names.len());
    let mut missing = Vec::new();
    for name in names {
        match by_name.get(name) {
            Some(privilege) => resolved.push(privilege.clone()),
            None => missing.push(name.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(StoreError::ReferentialConflict {
            entity: ENTITY,
            ids: missing,
        });
    }
    Ok(resolved)
}
