use grantbook_core::{
    AccountService, AccountStore, Argon2Codec, NewAccountRequest, NewPrivilege, OpContext,
    RegistryError, ServiceError, SqliteAccountStore, StoreConfig, StoreRegistry,
};
use std::collections::HashMap;
use std::sync::Arc;

fn config(pairs: &[(&str, &str)]) -> StoreConfig {
    let env = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<HashMap<_, _>>();
    StoreConfig::from_lookup(|key| env.get(key).cloned()).unwrap()
}

#[test]
fn configured_backend_resolves_through_registry() {
    let dir = tempfile::tempdir().unwrap();
    let db_url = format!("sqlite:{}", dir.path().join("accounts.db").display());
    let config = config(&[("GRANTBOOK_DB_URL", db_url.as_str()), ("GRANTBOOK_MAX_LIMIT", "20")]);

    let mut registry = StoreRegistry::new();
    registry
        .register_with(&config.backend, || SqliteAccountStore::open(&config))
        .unwrap();

    let store = registry.get(&config.backend).unwrap();
    assert_eq!(store.backend(), "sqlite");
    assert_eq!(store.max_limit(), 20);

    assert!(matches!(
        registry.get("mariadb"),
        Err(RegistryError::NotRegistered(_))
    ));
}

#[test]
fn service_over_registry_store_registers_and_authenticates() {
    let mut registry = StoreRegistry::new();
    registry
        .register_with("sqlite", || SqliteAccountStore::open_in_memory(100))
        .unwrap();
    let store = registry.get("sqlite").unwrap();
    let codec = Argon2Codec::with_costs(256, 1, 1).unwrap();
    let service = AccountService::new(store, Arc::new(codec));
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
        .unwrap();
    let created = service
        .register(
            &cx,
            NewAccountRequest {
                name: "Admin 1".to_string(),
                email: "admin1@cool.com".to_string(),
                password: "dodol123".to_string(),
                privileges: vec!["Admin".to_string(), "User".to_string()],
            },
        )
        .unwrap();
    assert_eq!(created.privileges.names(), vec!["Admin", "User"]);

    let logged_in = service.authenticate(&cx, "Admin 1", "dodol123").unwrap();
    assert_eq!(logged_in.id, created.id);
    assert_eq!(
        service.authenticate(&cx, "Admin 1", "duren123").unwrap_err(),
        ServiceError::InvalidCredentials
    );

    let json = serde_json::to_value(&logged_in).unwrap();
    assert!(json.get("credential").is_none());
    assert_eq!(json["privileges"][0]["name"], "Admin");
}

#[test]
fn list_reads_serialize_privileges_as_null() {
    let store = SqliteAccountStore::open_in_memory(10).unwrap();
    let cx = OpContext::background();
    let codec = Argon2Codec::with_costs(256, 1, 1).unwrap();
    let service = AccountService::new(Arc::new(store), Arc::new(codec));
    service
        .register(
            &cx,
            NewAccountRequest {
                name: "User 1".to_string(),
                email: "user1@foo.com".to_string(),
                password: "dodol123".to_string(),
                privileges: Vec::new(),
            },
        )
        .unwrap();

    let page = service
        .store()
        .find_accounts(&cx, &Default::default(), 0, 10)
        .unwrap();
    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["total"], 1);
    assert!(json["items"][0]["privileges"].is_null());
}
