//! Backend constraint-violation translation.
//!
//! # Responsibility
//! - Map raw backend errors onto `StoreError` variants.
//! - Keep backend-specific message parsing out of store logic.
//!
//! # Invariants
//! - Unique violations yield `DuplicateKey` with the offending field and the
//!   value taken from the attempted write.
//! - Foreign-key violations yield `ReferentialConflict`.
//! - Every other failure yields `WriteFailed`.

use crate::repo::error::StoreError;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::ffi;
use rusqlite::ErrorCode;
use std::collections::BTreeMap;

static SQLITE_UNIQUE_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^UNIQUE constraint failed: (?P<columns>.+)$").expect("static regex is valid")
});

const SQLITE_FOREIGN_KEY_MESSAGE: &str = "FOREIGN KEY constraint failed";

/// Diagnostic description of the write that failed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteContext {
    pub entity: &'static str,
    pub values: BTreeMap<&'static str, String>,
    pub ids: Vec<String>,
}

impl WriteContext {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            ..Self::default()
        }
    }

    pub fn value(mut self, field: &'static str, value: impl Into<String>) -> Self {
        self.values.insert(field, value.into());
        self
    }

    pub fn ids<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.ids = ids.into_iter().map(|id| id.to_string()).collect();
        self
    }

    /// Renders the context as `(field=value, ...)` for diagnostics.
    pub fn render(&self) -> String {
        let fields = self
            .values
            .iter()
            .map(|(field, value)| format!("{field}={value}"))
            .collect::<Vec<_>>();
        format!("({})", fields.join(", "))
    }
}

/// Backend-specific error translator.
pub trait ConstraintTranslator: Send + Sync {
    type BackendError;

    fn translate(&self, err: Self::BackendError, context: &WriteContext) -> StoreError;
}

/// Translator for SQLite (`rusqlite`) errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConstraintTranslator;

impl ConstraintTranslator for SqliteConstraintTranslator {
    type BackendError = rusqlite::Error;

    fn translate(&self, err: rusqlite::Error, context: &WriteContext) -> StoreError {
        if let rusqlite::Error::SqliteFailure(failure, message) = &err {
            if failure.code == ErrorCode::ConstraintViolation {
                let message = message.as_deref().unwrap_or_default();
                if failure.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY
                    || message == SQLITE_FOREIGN_KEY_MESSAGE
                {
                    return StoreError::ReferentialConflict {
                        entity: context.entity,
                        ids: context.ids.clone(),
                    };
                }
                if let Some(duplicate) = parse_sqlite_unique(message, context) {
                    return duplicate;
                }
            }
        }
        StoreError::WriteFailed {
            entity: context.entity,
            cause: err.to_string(),
        }
    }
}

/// Parses `UNIQUE constraint failed: table.col[, table.col]`.
fn parse_sqlite_unique(message: &str, context: &WriteContext) -> Option<StoreError> {
    let captures = SQLITE_UNIQUE_RX.captures(message)?;
    let mut entity = context.entity;
    let mut columns = Vec::new();
    for qualified in captures["columns"].split(", ") {
        match qualified.split_once('.') {
            Some((table, column)) => {
                if table != entity && columns.is_empty() {
                    entity = known_entity(table).unwrap_or(entity);
                }
                columns.push(column);
            }
            None => columns.push(qualified),
        }
    }

    let (field, value) = match columns.as_slice() {
        [column] => {
            let value = context
                .values
                .get(*column)
                .cloned()
                .unwrap_or_else(|| context.render());
            ((*column).to_string(), value)
        }
        _ => (columns.join(","), context.render()),
    };

    Some(StoreError::DuplicateKey {
        entity,
        field,
        value,
    })
}

fn known_entity(table: &str) -> Option<&'static str> {
    match table {
        "account" => Some("account"),
        "privilege" => Some("privilege"),
        "account_privilege" => Some("account_privilege"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ConstraintTranslator, SqliteConstraintTranslator, WriteContext};
    use crate::repo::error::StoreError;
    use rusqlite::ffi;

    fn constraint_error(extended_code: i32, message: &str) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(ffi::Error::new(extended_code), Some(message.to_string()))
    }

    #[test]
    fn unique_violation_reports_field_and_written_value() {
        let context = WriteContext::new("account")
            .value("name", "Admin 1")
            .value("email", "admin1@cool.com");
        let err = SqliteConstraintTranslator.translate(
            constraint_error(
                ffi::SQLITE_CONSTRAINT_UNIQUE,
                "UNIQUE constraint failed: account.email",
            ),
            &context,
        );
        assert_eq!(
            err,
            StoreError::DuplicateKey {
                entity: "account",
                field: "email".to_string(),
                value: "admin1@cool.com".to_string(),
            }
        );
    }

    #[test]
    fn composite_unique_violation_renders_context() {
        let context = WriteContext::new("account_privilege")
            .value("account_id", "1")
            .value("privilege_id", "2");
        let err = SqliteConstraintTranslator.translate(
            constraint_error(
                ffi::SQLITE_CONSTRAINT_UNIQUE,
                "UNIQUE constraint failed: account_privilege.account_id, account_privilege.privilege_id",
            ),
            &context,
        );
        assert_eq!(
            err,
            StoreError::DuplicateKey {
                entity: "account_privilege",
                field: "account_id,privilege_id".to_string(),
                value: "(account_id=1, privilege_id=2)".to_string(),
            }
        );
    }

    #[test]
    fn foreign_key_violation_reports_ids() {
        let context = WriteContext::new("privilege").ids([2_i64, 3]);
        let err = SqliteConstraintTranslator.translate(
            constraint_error(
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                "FOREIGN KEY constraint failed",
            ),
            &context,
        );
        assert_eq!(
            err,
            StoreError::ReferentialConflict {
                entity: "privilege",
                ids: vec!["2".to_string(), "3".to_string()],
            }
        );
    }

    #[test]
    fn other_failures_fall_back_to_write_failed() {
        let err = SqliteConstraintTranslator.translate(
            rusqlite::Error::QueryReturnedNoRows,
            &WriteContext::new("account"),
        );
        assert!(matches!(err, StoreError::WriteFailed { entity: "account", .. }));

        let not_null = SqliteConstraintTranslator.translate(
            constraint_error(
                ffi::SQLITE_CONSTRAINT_NOTNULL,
                "NOT NULL constraint failed: account.email",
            ),
            &WriteContext::new("account"),
        );
        assert_eq!(not_null.code(), "write_failed");
    }
}
