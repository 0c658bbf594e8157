//! Privilege domain model.
//!
//! # Invariants
//! - `name` is unique among persisted privileges (store-enforced).
//! - Privileges are immutable after creation; only add/delete exist.

use serde::{Deserialize, Serialize};

/// Surrogate id assigned by the store.
pub type PrivilegeId = i64;

/// Persisted privilege row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Privilege {
    pub id: PrivilegeId,
    pub name: String,
    pub description: String,
}

/// Insert payload for a privilege; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPrivilege {
    pub name: String,
    pub description: String,
}

impl NewPrivilege {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}
