//! Account domain model.
//!
//! # Responsibility
//! - Define the persisted account shape and its insert/patch payloads.
//! - Represent the privilege relation as loaded vs not loaded.
//!
//! # Invariants
//! - `name` and `email` are unique among accounts (store-enforced).
//! - `credential` always holds an encoded value, never plaintext.
//! - A patch field that is `Absent` leaves the stored value untouched.
//!
//! # See also
//! - `crate::repo::store::AccountStore`

use crate::credential::Credential;
use crate::model::privilege::Privilege;
use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};

/// Surrogate id assigned by the store.
pub type AccountId = i64;

/// Privilege relation attached to an account read model.
///
/// List reads skip the join and return `NotLoaded`; single-entity reads
/// return `Loaded`, which may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccountPrivileges {
    #[default]
    NotLoaded,
    Loaded(Vec<Privilege>),
}

impl AccountPrivileges {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Returns the loaded privileges, or `None` when the relation was skipped.
    pub fn loaded(&self) -> Option<&[Privilege]> {
        match self {
            Self::Loaded(privileges) => Some(privileges.as_slice()),
            Self::NotLoaded => None,
        }
    }

    /// Privilege names in relation order; empty when not loaded.
    pub fn names(&self) -> Vec<&str> {
        self.loaded()
            .map(|privileges| privileges.iter().map(|p| p.name.as_str()).collect())
            .unwrap_or_default()
    }
}

// `null` for not loaded, array otherwise.
impl Serialize for AccountPrivileges {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::NotLoaded => serializer.serialize_none(),
            Self::Loaded(privileges) => {
                let mut seq = serializer.serialize_seq(Some(privileges.len()))?;
                for privilege in privileges {
                    seq.serialize_element(privilege)?;
                }
                seq.end()
            }
        }
    }
}

/// Persisted account read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub credential: Credential,
    pub privileges: AccountPrivileges,
}

/// Insert payload for one account.
///
/// `privileges` holds names of existing privileges; unknown names fail the
/// whole batch rather than creating new privilege rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub credential: Credential,
    pub privileges: Vec<String>,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, email: impl Into<String>, credential: Credential) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            credential,
            privileges: Vec::new(),
        }
    }

    pub fn with_privilege(mut self, name: impl Into<String>) -> Self {
        self.privileges.push(name.into());
        self
    }
}

/// Presence wrapper for partial updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    Absent,
    Present(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Field<T> {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Present(value),
            None => Self::Absent,
        }
    }
}

/// Partial update for one account, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPatch {
    pub id: AccountId,
    pub name: Field<String>,
    pub email: Field<String>,
    pub credential: Field<Credential>,
    /// Target privilege set by name. `Present(vec![])` revokes everything.
    pub privileges: Field<Vec<String>>,
}

impl AccountPatch {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Field::Present(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Field::Present(email.into());
        self
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Field::Present(credential);
        self
    }

    pub fn privileges<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.privileges = Field::Present(names.into_iter().map(Into::into).collect());
        self
    }

    /// Returns whether any scalar column is part of this patch.
    pub fn has_scalar_changes(&self) -> bool {
        self.name.is_present() || self.email.is_present() || self.credential.is_present()
    }
}

#[cfg(test)]
mod tests {
    use super::{Account, AccountPatch, AccountPrivileges, Field};
    use crate::credential::Credential;
    use crate::model::privilege::Privilege;

    fn account(privileges: AccountPrivileges) -> Account {
        Account {
            id: 1,
            name: "Demo".to_string(),
            email: "demo@foo.com".to_string(),
            credential: Credential::from_encoded("$argon2id$hidden"),
            privileges,
        }
    }

    #[test]
    fn not_loaded_and_empty_serialize_differently() {
        let not_loaded = serde_json::to_value(account(AccountPrivileges::NotLoaded)).unwrap();
        let empty = serde_json::to_value(account(AccountPrivileges::Loaded(vec![]))).unwrap();
        assert!(not_loaded["privileges"].is_null());
        assert_eq!(empty["privileges"], serde_json::json!([]));
    }

    #[test]
    fn serialized_account_omits_credential() {
        let value = serde_json::to_value(account(AccountPrivileges::Loaded(vec![Privilege {
            id: 1,
            name: "Admin".to_string(),
            description: "Administrator".to_string(),
        }])))
        .unwrap();
        assert!(value.get("credential").is_none());
        assert_eq!(value["privileges"][0]["name"], "Admin");
    }

    #[test]
    fn patch_tracks_presence_per_field() {
        let patch = AccountPatch::new(3).name("User 4");
        assert!(patch.has_scalar_changes());
        assert_eq!(patch.email, Field::Absent);
        assert!(!patch.privileges.is_present());

        let revoke_all = AccountPatch::new(3).privileges(Vec::<String>::new());
        assert!(!revoke_all.has_scalar_changes());
        assert_eq!(revoke_all.privileges, Field::Present(vec![]));
    }

    #[test]
    fn field_from_option() {
        assert_eq!(Field::from(Some(1)), Field::Present(1));
        assert_eq!(Field::<i32>::from(None), Field::Absent);
    }
}
