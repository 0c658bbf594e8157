//! Account and privilege persistence for grantbook.
//! This crate owns the store contract, its SQLite backend and the
//! credential boundary; adapters stay thin on top of it.

pub mod config;
pub mod credential;
pub mod db;
pub mod logging;
pub mod model;
pub mod registry;
pub mod repo;
pub mod service;

pub use config::{ConfigError, DatabaseUrl, StoreConfig};
pub use credential::{Argon2Codec, Credential, CredentialCodec, CredentialError};
pub use logging::{
    default_log_level, init_logging, init_stderr_logging, logging_status, LogSink,
};
pub use model::account::{
    Account, AccountId, AccountPatch, AccountPrivileges, Field, NewAccount,
};
pub use model::filter::{AccountFilter, Criterion, PrivilegeFilter, TextCriterion};
pub use model::privilege::{NewPrivilege, Privilege, PrivilegeId};
pub use registry::{RegistryError, StoreRegistry};
pub use repo::context::{CancelHandle, OpContext};
pub use repo::error::{CancelReason, StoreError, StoreResult};
pub use repo::sqlite::SqliteAccountStore;
pub use repo::store::{AccountStore, Page, ReconcileSummary};
pub use service::account_service::{
    AccountService, AccountUpdateRequest, NewAccountRequest, ServiceError, ServiceResult,
};

