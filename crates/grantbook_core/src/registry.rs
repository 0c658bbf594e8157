//! Backend name to store registry.
//!
//! Built once at startup and handed to adapters; there is no global
//! instance. A missing backend is a configuration error, not a retryable one.

use crate::repo::error::StoreResult;
use crate::repo::store::AccountStore;
use log::info;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Registration/lookup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    InvalidName(String),
    Duplicate(String),
    NotRegistered(String),
    /// Factory failed while constructing the store.
    Init { name: String, message: String },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(value) => write!(f, "store backend name is invalid: {value}"),
            Self::Duplicate(value) => write!(f, "store backend already registered: {value}"),
            Self::NotRegistered(value) => write!(f, "store backend not registered: {value}"),
            Self::Init { name, message } => {
                write!(f, "store backend {name} failed to initialize: {message}")
            }
        }
    }
}

impl Error for RegistryError {}

/// Runtime store registry keyed by backend name.
#[derive(Default)]
pub struct StoreRegistry {
    stores: BTreeMap<String, Arc<dyn AccountStore>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an already initialized store under `name`.
    pub fn register(
        &mut self,
        name: &str,
        store: Arc<dyn AccountStore>,
    ) -> Result<(), RegistryError> {
        let name = self.claim(name)?;
        info!(
            "event=store_register module=registry status=ok backend={} name={}",
            store.backend(),
            name
        );
        self.stores.insert(name, store);
        Ok(())
    }

    /// Runs `factory` once and registers its store under `name`.
    ///
    /// The name is validated before the factory runs.
    pub fn register_with<F, S>(&mut self, name: &str, factory: F) -> Result<(), RegistryError>
    where
        F: FnOnce() -> StoreResult<S>,
        S: AccountStore + 'static,
    {
        let name = self.claim(name)?;
        let store = factory().map_err(|err| RegistryError::Init {
            name: name.clone(),
            message: err.to_string(),
        })?;
        self.register(&name, Arc::new(store))
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Returns sorted backend names.
    pub fn names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }

    /// Returns the store registered under `name`.
    pub fn get(&self, name: &str) -> Result<Arc<dyn AccountStore>, RegistryError> {
        let normalized = name.trim();
        self.stores
            .get(normalized)
            .cloned()
            .ok_or_else(|| RegistryError::NotRegistered(normalized.to_string()))
    }

    fn claim(&self, name: &str) -> Result<String, RegistryError> {
        let name = name.trim().to_string();
        if !is_valid_name(&name) {
            return Err(RegistryError::InvalidName(name));
        }
        if self.stores.contains_key(name.as_str()) {
            return Err(RegistryError::Duplicate(name));
        }
        Ok(name)
    }
}

fn is_valid_name(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
