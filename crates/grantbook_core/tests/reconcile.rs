use grantbook_core::{
    AccountId, AccountPatch, AccountStore, CancelReason, Credential, NewAccount, NewPrivilege,
    OpContext, PrivilegeId, SqliteAccountStore, StoreError,
};
use std::time::{Duration, Instant};

struct Fixture {
    store: SqliteAccountStore,
    cx: OpContext,
    account_id: AccountId,
}

impl Fixture {
    fn with_grants(names: &[&str]) -> Self {
        let store = SqliteAccountStore::open_in_memory(100).unwrap();
        let cx = OpContext::background();
        store
            .add_privileges(
                &cx,
                vec![
                    NewPrivilege::new("A", "first"),
                    NewPrivilege::new("B", "second"),
                    NewPrivilege::new("C", "third"),
                ],
            )
            .unwrap();
        let account = names.iter().fold(
            NewAccount::new(
                "Demo",
                "demo@foo.com",
                Credential::from_encoded("$argon2id$v=19$m=256,t=1,p=1$c2FsdA$aGFzaA"),
            ),
            |acc, name| acc.with_privilege(*name),
        );
        let account_id = store.add_accounts(&cx, vec![account]).unwrap()[0].id;
        Self {
            store,
            cx,
            account_id,
        }
    }

    fn id_of(&self, name: &str) -> PrivilegeId {
        self.store.get_privilege_by_name(&self.cx, name).unwrap().id
    }

    fn granted(&self) -> Vec<String> {
        self.store
            .account_privileges(&self.cx, self.account_id)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect()
    }

    fn grant_count(&self) -> usize {
        self.granted().len()
    }
}

#[test]
fn reconcile_inserts_and_removes_only_the_difference() {
    let fx = Fixture::with_grants(&["A", "C"]);

    let summary = fx
        .store
        .update_account(&fx.cx, AccountPatch::new(fx.account_id).privileges(["A", "B"]))
        .unwrap();
    assert_eq!(summary.inserted, vec![fx.id_of("B")]);
    assert_eq!(summary.removed, vec![fx.id_of("C")]);
    assert_eq!(fx.granted(), vec!["A", "B"]);
}

#[test]
fn unchanged_set_is_a_no_op() {
    let fx = Fixture::with_grants(&["A", "B"]);

    let summary = fx
        .store
        .update_account(&fx.cx, AccountPatch::new(fx.account_id).privileges(["B", "A"]))
        .unwrap();
    assert!(summary.is_empty());
    assert_eq!(fx.granted(), vec!["A", "B"]);
}

#[test]
fn empty_target_revokes_all_grants() {
    let fx = Fixture::with_grants(&["A", "B", "C"]);

    let summary = fx
        .store
        .update_account(
            &fx.cx,
            AccountPatch::new(fx.account_id).privileges(Vec::<String>::new()),
        )
        .unwrap();
    assert_eq!(summary.removed.len(), 3);
    assert_eq!(fx.grant_count(), 0);
}

#[test]
fn absent_privileges_leave_grants_alone() {
    let fx = Fixture::with_grants(&["C"]);

    let summary = fx
        .store
        .update_account(&fx.cx, AccountPatch::new(fx.account_id).name("Renamed"))
        .unwrap();
    assert!(summary.is_empty());
    assert_eq!(fx.granted(), vec!["C"]);
}

#[test]
fn unknown_target_name_rolls_back_scalar_changes_too() {
    let fx = Fixture::with_grants(&["A"]);

    let err = fx
        .store
        .update_account(
            &fx.cx,
            AccountPatch::new(fx.account_id)
                .name("Renamed")
                .privileges(["A", "Missing"]),
        )
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::ReferentialConflict {
            entity: "privilege",
            ids: vec!["Missing".to_string()],
        }
    );
    let account = fx.store.get_account(&fx.cx, fx.account_id).unwrap();
    assert_eq!(account.name, "Demo");
    assert_eq!(fx.granted(), vec!["A"]);
}

#[test]
fn cancelled_context_stops_before_any_write() {
    let fx = Fixture::with_grants(&["A"]);
    let (cx, handle) = OpContext::background().cancellable();
    handle.cancel();

    let err = fx
        .store
        .update_account(&cx, AccountPatch::new(fx.account_id).privileges(["B"]))
        .unwrap_err();
    assert_eq!(err, StoreError::Cancelled(CancelReason::Requested));
    assert_eq!(fx.granted(), vec!["A"]);
}

#[test]
fn expired_deadline_stops_before_any_write() {
    let fx = Fixture::with_grants(&["A"]);
    let cx = OpContext::with_deadline(Instant::now() - Duration::from_millis(1));

    let err = fx
        .store
        .add_privileges(&cx, vec![NewPrivilege::new("D", "fourth")])
        .unwrap_err();
    assert_eq!(err, StoreError::Cancelled(CancelReason::DeadlineExceeded));
    assert!(fx.store.get_privilege_by_name(&fx.cx, "D").is_err());
}

#[test]
fn deleting_account_cascades_its_grants() {
    let fx = Fixture::with_grants(&["A", "B"]);
    let a = fx.id_of("A");

    fx.store.delete_accounts(&fx.cx, &[fx.account_id]).unwrap();
    assert!(matches!(
        fx.store.account_privileges(&fx.cx, fx.account_id),
        Err(StoreError::NotFound { .. })
    ));
    fx.store.delete_privileges(&fx.cx, &[a]).unwrap();
}
