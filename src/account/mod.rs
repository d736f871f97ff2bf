use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

mod store;

pub use store::AccountStore;

/// Maximum account id length
const MAX_ID_LEN: usize = 64;

/// A selling-partner account whose credentials the vault protects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Caller-chosen identifier, also part of the blob keys
    pub id: String,
    /// Display name
    pub name: String,
    /// When the account was registered
    pub created_at: DateTime<Utc>,
}

/// Read/delete view over the account records.
///
/// The credential workflows only resolve and delete accounts; they never
/// create or modify them.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// All accounts keyed by id.
    async fn get_all(&self) -> Result<HashMap<String, Account>>;

    /// Single account lookup.
    async fn get(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.get_all().await?.remove(id))
    }

    /// Removes an account. Returns false if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// Account registry with optional SQLite persistence
pub struct AccountRegistry {
    accounts: Arc<DashMap<String, Account>>,
    store: Option<Arc<AccountStore>>,
}

impl AccountRegistry {
    /// Create new empty, non-persistent registry
    pub fn new() -> Self {
        Self {
            accounts: Arc::new(DashMap::new()),
            store: None,
        }
    }

    /// Create a registry backed by `store`, loading every persisted account
    pub fn with_store(store: Arc<AccountStore>) -> Result<Self> {
        let accounts = DashMap::new();
        for account in store.load_all()? {
            accounts.insert(account.id.clone(), account);
        }

        Ok(Self {
            accounts: Arc::new(accounts),
            store: Some(store),
        })
    }

    /// Register a new account
    ///
    /// Fails if the id is invalid or already registered.
    pub fn register(&self, id: &str, name: &str) -> Result<Account, RegistrationError> {
        Self::validate_id(id)?;

        let account = Account {
            id: id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        // Entry API keeps check-and-insert atomic per id
        match self.accounts.entry(id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(RegistrationError::AlreadyExists)
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                if let Some(store) = &self.store {
                    store
                        .insert(&account)
                        .map_err(|e| RegistrationError::Storage(format!("{:#}", e)))?;
                }
                slot.insert(account.clone());
            }
        }

        Ok(account)
    }

    /// Validate account id format
    ///
    /// Rules: 1-64 characters, ASCII alphanumeric + dash/underscore.
    /// The id ends up in blob keys, so separators and wildcards are excluded.
    pub fn validate_id(id: &str) -> Result<(), ValidationError> {
        if id.is_empty() {
            return Err(ValidationError::Empty);
        }
        if id.len() > MAX_ID_LEN {
            return Err(ValidationError::TooLong);
        }

        for c in id.chars() {
            if !c.is_ascii_alphanumeric() && c != '-' && c != '_' {
                return Err(ValidationError::InvalidCharacters(format!(
                    "Invalid character '{}' (must be [A-Za-z0-9-_])",
                    c
                )));
            }
        }

        Ok(())
    }

    /// Get count of registered accounts
    pub fn count(&self) -> usize {
        self.accounts.len()
    }
}

impl Default for AccountRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountDirectory for AccountRegistry {
    async fn get_all(&self) -> Result<HashMap<String, Account>> {
        Ok(self
            .accounts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.accounts.get(id).map(|a| a.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        if let Some(store) = &self.store {
            store.delete(id)?;
        }

        let removed = self.accounts.remove(id).is_some();
        if !removed {
            warn!(account_id = %id, "Delete requested for unknown account");
        }
        Ok(removed)
    }
}

/// Registration errors
#[derive(Debug, PartialEq, Error)]
pub enum RegistrationError {
    #[error("{0}")]
    InvalidId(#[from] ValidationError),
    #[error("Account already exists")]
    AlreadyExists,
    #[error("Failed to persist account: {0}")]
    Storage(String),
}

/// Account id validation errors
#[derive(Debug, PartialEq, Error)]
pub enum ValidationError {
    #[error("Account id must not be empty")]
    Empty,
    #[error("Account id must be at most {} characters", MAX_ID_LEN)]
    TooLong,
    #[error("{0}")]
    InvalidCharacters(String),
}
