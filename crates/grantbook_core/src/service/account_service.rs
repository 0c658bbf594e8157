//! Account use-case service.
//!
//! # Responsibility
//! - Accept plaintext passwords from adapters and encode them before they
//!   reach the store.
//! - Verify login attempts against stored credentials.
//!
//! # Invariants
//! - Plaintext passwords are never persisted or logged.
//! - Failed logins do not reveal whether the name or the password was wrong.

use crate::credential::{CredentialCodec, CredentialError};
use crate::model::account::{Account, AccountId, AccountPatch, Field, NewAccount};
use crate::repo::context::OpContext;
use crate::repo::error::StoreError;
use crate::repo::store::{AccountStore, ReconcileSummary};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    Store(StoreError),
    Credential(CredentialError),
    /// Unknown account name or wrong password.
    InvalidCredentials,
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Store(err) => err.code(),
            Self::Credential(_) => "credential",
            Self::InvalidCredentials => "invalid_credentials",
        }
    }

    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Store(err) => err.is_client_error(),
            Self::Credential(_) => false,
            Self::InvalidCredentials => true,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Credential(err) => write!(f, "{err}"),
            Self::InvalidCredentials => write!(f, "invalid account name or password"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Credential(err) => Some(err),
            Self::InvalidCredentials => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<CredentialError> for ServiceError {
    fn from(value: CredentialError) -> Self {
        Self::Credential(value)
    }
}

/// Registration input carrying a plaintext password.
#[derive(Clone, PartialEq, Eq)]
pub struct NewAccountRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Names of existing privileges to grant.
    pub privileges: Vec<String>,
}

impl std::fmt::Debug for NewAccountRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccountRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("privileges", &self.privileges)
            .finish()
    }
}

/// Partial update input; `password` is plaintext and encoded on the way in.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccountUpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub privileges: Option<Vec<String>>,
}

impl std::fmt::Debug for AccountUpdateRequest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountUpdateRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("privileges", &self.privileges)
            .finish()
    }
}

/// Use-case service wrapping one store and one credential codec.
pub struct AccountService<S: AccountStore + ?Sized> {
    store: Arc<S>,
    codec: Arc<dyn CredentialCodec>,
}

impl<S: AccountStore + ?Sized> AccountService<S> {
    pub fn new(store: Arc<S>, codec: Arc<dyn CredentialCodec>) -> Self {
        Self { store, codec }
    }

    /// Underlying store for operations that need no credential handling.
    pub fn store(&self) -> &S {
        self.store.as_ref()
    }

    /// Encodes the password and creates the account with its grants.
    pub fn register(&self, cx: &OpContext, request: NewAccountRequest) -> ServiceResult<Account> {
        require_password(&request.password)?;
        let credential = self.codec.encode(&request.password)?;
        let account = NewAccount {
            name: request.name,
            email: request.email,
            credential,
            privileges: request.privileges,
        };

        let created = self.store.add_accounts(cx, vec![account])?;
        let account = created.into_iter().next().ok_or(StoreError::WriteFailed {
            entity: "account",
            cause: "insert returned no rows".to_string(),
        })?;
        info!(
            "event=account_register module=service status=ok account_id={}",
            account.id
        );
        Ok(account)
    }

    /// Replaces the stored credential; nothing else changes.
    pub fn change_password(
        &self,
        cx: &OpContext,
        id: AccountId,
        password: &str,
    ) -> ServiceResult<()> {
        require_password(password)?;
        let credential = self.codec.encode(password)?;
        self.store
            .update_account(cx, AccountPatch::new(id).credential(credential))?;
        info!(
            "event=account_password_change module=service status=ok account_id={}",
            id
        );
        Ok(())
    }

    /// Applies a partial update, encoding the password when present.
    pub fn update(
        &self,
        cx: &OpContext,
        id: AccountId,
        request: AccountUpdateRequest,
    ) -> ServiceResult<ReconcileSummary> {
        let credential = match request.password.as_deref() {
            Some(password) => {
                require_password(password)?;
                Field::Present(self.codec.encode(password)?)
            }
            None => Field::Absent,
        };
        let patch = AccountPatch {
            id,
            name: request.name.into(),
            email: request.email.into(),
            credential,
            privileges: request.privileges.into(),
        };
        Ok(self.store.update_account(cx, patch)?)
    }

    /// Loads the account by name and verifies `password` against it.
    pub fn authenticate(
        &self,
        cx: &OpContext,
        name: &str,
        password: &str,
    ) -> ServiceResult<Account> {
        let account = match self.store.get_account_by_name(cx, name) {
            Ok(account) => account,
            Err(StoreError::NotFound { .. }) => {
                warn!("event=account_login module=service status=error error_code=invalid_credentials");
                return Err(ServiceError::InvalidCredentials);
            }
            Err(err) => return Err(err.into()),
        };

        if !self.codec.verify(password, &account.credential) {
            warn!("event=account_login module=service status=error error_code=invalid_credentials");
            return Err(ServiceError::InvalidCredentials);
        }
        info!(
            "event=account_login module=service status=ok account_id={}",
            account.id
        );
        Ok(account)
    }
}

fn require_password(password: &str) -> Result<(), StoreError> {
    if password.is_empty() {
        return Err(StoreError::Validation("password cannot be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{AccountService, AccountUpdateRequest, NewAccountRequest, ServiceError};
    use crate::credential::Argon2Codec;
    use crate::model::privilege::NewPrivilege;
    use crate::repo::context::OpContext;
    use crate::repo::error::StoreError;
    use crate::repo::sqlite::SqliteAccountStore;
    use crate::repo::store::AccountStore;
    use std::sync::Arc;

    fn service() -> AccountService<SqliteAccountStore> {
        let store = SqliteAccountStore::open_in_memory(100).expect("store should open");
        let codec = Argon2Codec::with_costs(256, 1, 1).expect("codec params should be valid");
        AccountService::new(Arc::new(store), Arc::new(codec))
    }

    fn request(name: &str, password: &str) -> NewAccountRequest {
        NewAccountRequest {
            name: name.to_string(),
            email: format!("{}@foo.com", name.to_lowercase().replace(' ', "")),
            password: password.to_string(),
            privileges: Vec::new(),
        }
    }

    #[test]
    fn register_stores_encoded_credential() {
        let service = service();
        let cx = OpContext::background();
        let account = service
            .register(&cx, request("User 1", "hunter2"))
            .expect("register should succeed");
        assert!(account.credential.as_str().starts_with("$argon2id$"));
        assert!(!account.credential.as_str().contains("hunter2"));
    }

    #[test]
    fn authenticate_hides_which_part_was_wrong() {
        let service = service();
        let cx = OpContext::background();
        service
            .register(&cx, request("User 1", "hunter2"))
            .expect("register should succeed");

        let ok = service
            .authenticate(&cx, "User 1", "hunter2")
            .expect("correct password should authenticate");
        assert_eq!(ok.name, "User 1");
        assert_eq!(
            service.authenticate(&cx, "User 1", "wrong").unwrap_err(),
            ServiceError::InvalidCredentials
        );
        assert_eq!(
            service.authenticate(&cx, "Nobody", "hunter2").unwrap_err(),
            ServiceError::InvalidCredentials
        );
    }

    #[test]
    fn change_password_replaces_only_the_credential() {
        let service = service();
        let cx = OpContext::background();
        service
            .store()
            .add_privileges(&cx, vec![NewPrivilege::new("User", "Regular user")])
            .expect("privilege should insert");
        let mut new_account = request("User 2", "first");
        new_account.privileges = vec!["User".to_string()];
        let account = service
            .register(&cx, new_account)
            .expect("register should succeed");

        service
            .change_password(&cx, account.id, "second")
            .expect("password change should succeed");
        assert!(service.authenticate(&cx, "User 2", "first").is_err());
        let reloaded = service
            .authenticate(&cx, "User 2", "second")
            .expect("new password should authenticate");
        assert_eq!(reloaded.email, account.email);
        assert_eq!(reloaded.privileges.names(), vec!["User"]);
    }

    #[test]
    fn empty_password_is_rejected_before_encoding() {
        let service = service();
        let cx = OpContext::background();
        let err = service.register(&cx, request("User 3", "")).unwrap_err();
        assert!(matches!(err, ServiceError::Store(StoreError::Validation(_))));
        assert!(err.is_client_error());
    }

    #[test]
    fn update_encodes_password_and_reconciles() {
        let service = service();
        let cx = OpContext::background();
        service
            .store()
            .add_privileges(
                &cx,
                vec![
                    NewPrivilege::new("Admin", "Administrator"),
                    NewPrivilege::new("User", "Regular user"),
                ],
            )
            .expect("privileges should insert");
        let account = service
            .register(&cx, request("Demo", "demo"))
            .expect("register should succeed");

        let summary = service
            .update(
                &cx,
                account.id,
                AccountUpdateRequest {
                    password: Some("changed".to_string()),
                    privileges: Some(vec!["Admin".to_string(), "User".to_string()]),
                    ..AccountUpdateRequest::default()
                },
            )
            .expect("update should succeed");
        assert_eq!(summary.inserted.len(), 2);
        assert!(summary.removed.is_empty());
        assert!(service.authenticate(&cx, "Demo", "changed").is_ok());
    }

    #[test]
    fn debug_output_redacts_passwords() {
        let rendered = format!("{:?}", request("User 1", "hunter2"));
        assert!(!rendered.contains("hunter2"));
        let update = AccountUpdateRequest {
            password: Some("hunter2".to_string()),
            ..AccountUpdateRequest::default()
        };
        assert!(!format!("{update:?}").contains("hunter2"));
    }
}
