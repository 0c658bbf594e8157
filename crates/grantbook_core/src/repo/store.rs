//! Account store contract.
//!
//! # Responsibility
//! - Define the one backend-agnostic interface callers program against.
//!
//! # Invariants
//! - Every write runs inside exactly one transaction that is committed or
//!   rolled back before the method returns.
//! - Single-entity account reads load the privilege relation; list reads
//!   return it as `AccountPrivileges::NotLoaded`.
//! - Errors are always `StoreError`; backend error shapes never leak.

use crate::model::account::{Account, AccountId, AccountPatch, NewAccount};
use crate::model::filter::{AccountFilter, PrivilegeFilter};
use crate::model::privilege::{NewPrivilege, Privilege, PrivilegeId};
use crate::repo::context::OpContext;
use crate::repo::error::StoreResult;
use serde::Serialize;

/// One page of a find result plus the total matching row count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Count of all matching rows, independent of offset/limit.
    pub total: u64,
}

/// Grant changes applied by an account update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub inserted: Vec<PrivilegeId>,
    pub removed: Vec<PrivilegeId>,
}

impl ReconcileSummary {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.removed.is_empty()
    }
}

/// Persistence interface for accounts, privileges and their grants.
pub trait AccountStore: Send + Sync {
    /// Backend identifier, e.g. `sqlite`.
    fn backend(&self) -> &'static str;
    /// Largest `limit` accepted by find operations.
    fn max_limit(&self) -> u32;

    fn get_account(&self, cx: &OpContext, id: AccountId) -> StoreResult<Account>;
    fn get_account_by_name(&self, cx: &OpContext, name: &str) -> StoreResult<Account>;
    fn get_account_by_email(&self, cx: &OpContext, email: &str) -> StoreResult<Account>;
    /// Counts, then pages. Returned accounts do not load privileges.
    fn find_accounts(
        &self,
        cx: &OpContext,
        filter: &AccountFilter,
        offset: u64,
        limit: u32,
    ) -> StoreResult<Page<Account>>;
    /// Inserts all accounts and their grants atomically.
    fn add_accounts(&self, cx: &OpContext, accounts: Vec<NewAccount>) -> StoreResult<Vec<Account>>;
    /// Applies a partial update and, when present, reconciles grants.
    fn update_account(&self, cx: &OpContext, patch: AccountPatch) -> StoreResult<ReconcileSummary>;
    /// Deletes all ids or none.
    fn delete_accounts(&self, cx: &OpContext, ids: &[AccountId]) -> StoreResult<()>;
    /// Privileges currently granted to one account, in the order they were granted.
    fn account_privileges(&self, cx: &OpContext, account_id: AccountId)
        -> StoreResult<Vec<Privilege>>;

    fn get_privilege(&self, cx: &OpContext, id: PrivilegeId) -> StoreResult<Privilege>;
    fn get_privilege_by_name(&self, cx: &OpContext, name: &str) -> StoreResult<Privilege>;
    fn find_privileges(
        &self,
        cx: &OpContext,
        filter: &PrivilegeFilter,
        offset: u64,
        limit: u32,
    ) -> StoreResult<Page<Privilege>>;
    fn add_privileges(
        &self,
        cx: &OpContext,
        privileges: Vec<NewPrivilege>,
    ) -> StoreResult<Vec<Privilege>>;
    /// Deletes all ids or none; referenced privileges fail with `ReferentialConflict`.
    fn delete_privileges(&self, cx: &OpContext, ids: &[PrivilegeId]) -> StoreResult<()>;
}
