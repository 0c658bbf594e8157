//! Uniform error vocabulary for store operations.
//!
//! # Invariants
//! - Backend-native errors never leave the store; they are translated into
//!   one of these variants first.
//! - Messages carry entity names and offending values, never credentials.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Why an operation stopped before completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Requested,
    DeadlineExceeded,
}

/// Typed store error returned by every `AccountStore` operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Lookup by id/name/email matched zero rows.
    NotFound { entity: &'static str, key: String },
    /// Caller input rejected before touching storage.
    Validation(String),
    /// Unique constraint violation.
    DuplicateKey {
        entity: &'static str,
        field: String,
        value: String,
    },
    /// Delete blocked by a live reference, or a reference to a missing row.
    ReferentialConflict {
        entity: &'static str,
        ids: Vec<String>,
    },
    /// Uncategorized backend failure.
    WriteFailed { entity: &'static str, cause: String },
    /// Store unreachable or bootstrap failure.
    Connection(String),
    /// Caller deadline fired or cancellation was requested.
    Cancelled(CancelReason),
}

impl StoreError {
    /// Stable machine-readable code, used in log lines and adapter payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation(_) => "validation",
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::ReferentialConflict { .. } => "referential_conflict",
            Self::WriteFailed { .. } => "write_failed",
            Self::Connection(_) => "connection",
            Self::Cancelled(_) => "cancelled",
        }
    }

    /// Returns whether the caller's request caused the failure.
    ///
    /// Adapters map `true` to a client error and `false` to a server error.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Validation(_)
                | Self::DuplicateKey { .. }
                | Self::ReferentialConflict { .. }
        )
    }

    pub(crate) fn not_found(entity: &'static str, key: impl Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub(crate) fn backend(entity: &'static str, err: rusqlite::Error) -> Self {
        Self::WriteFailed {
            entity,
            cause: err.to_string(),
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::DuplicateKey {
                entity,
                field,
                value,
            } => write!(f, "duplicate {entity}.{field} '{value}'"),
            Self::ReferentialConflict { entity, ids } => {
                write!(f, "{entity} [{}]: record in use or missing", ids.join(", "))
            }
            Self::WriteFailed { entity, cause } => write!(f, "{entity} write failed: {cause}"),
            Self::Connection(message) => write!(f, "store unavailable: {message}"),
            Self::Cancelled(CancelReason::Requested) => write!(f, "operation cancelled"),
            Self::Cancelled(CancelReason::DeadlineExceeded) => {
                write!(f, "operation deadline exceeded")
            }
        }
    }
}

impl Error for StoreError {}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Connection(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{CancelReason, StoreError};

    #[test]
    fn client_errors_are_caller_caused() {
        assert!(StoreError::not_found("account", 7).is_client_error());
        assert!(StoreError::Validation("limit".to_string()).is_client_error());
        assert!(StoreError::DuplicateKey {
            entity: "account",
            field: "name".to_string(),
            value: "Demo".to_string(),
        }
        .is_client_error());
        assert!(!StoreError::WriteFailed {
            entity: "account",
            cause: "disk I/O error".to_string(),
        }
        .is_client_error());
        assert!(!StoreError::Cancelled(CancelReason::Requested).is_client_error());
    }

    #[test]
    fn display_names_entity_field_and_value() {
        let err = StoreError::DuplicateKey {
            entity: "account",
            field: "email".to_string(),
            value: "admin1@cool.com".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate account.email 'admin1@cool.com'");
        assert_eq!(err.code(), "duplicate_key");

        let conflict = StoreError::ReferentialConflict {
            entity: "privilege",
            ids: vec!["2".to_string()],
        };
        assert_eq!(conflict.to_string(), "privilege [2]: record in use or missing");
    }
}
