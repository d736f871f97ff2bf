//! Store / fetch / validate orchestration.
//!
//! Each operation validates its input, resolves the account through the
//! [`AccountDirectory`], builds one [`CredentialEncryptionService`] from the
//! caller's key and nonce, and moves envelopes through the [`CredentialStore`].
//!
//! Store and fetch propagate every error. Validate propagates only input and
//! account-resolution errors; its decrypt phase reports `false` instead.
//!
//! [`CredentialEncryptionService`]: crate::credentials::CredentialEncryptionService

use crate::account::{Account, AccountDirectory};
use crate::credentials::{CredentialBundle, CredentialStore};
use crate::error::{CredentialError, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod fetch;
mod store;
mod validate;

#[cfg(test)]
mod tests;

/// Input for [`CredentialWorkflows::store_credentials`].
///
/// Missing JSON fields deserialize as empty strings and fail validation.
/// Secret fields are wiped on drop and redacted in `Debug`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCredentialsRequest {
    #[serde(default)]
    pub account_id: String,
    #[serde(default = "empty_secret")]
    pub refresh_token: SecretString,
    #[serde(default)]
    pub client_id: String,
    #[serde(default = "empty_secret")]
    pub client_secret: SecretString,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default = "empty_secret")]
    pub access_key_secret: SecretString,
    #[serde(default)]
    pub role: String,
    #[serde(default = "empty_secret")]
    pub key: SecretString,
    #[serde(default)]
    pub nonce: Option<String>,
}

/// Both envelopes written by a store call.
///
/// When the caller omitted the nonce this is the only record tied to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCredentialsOutput {
    pub encrypted_credentials: String,
    pub encrypted_refresh_token: String,
}

/// Input for fetch and validate: account plus decryption material.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountKeyRequest {
    #[serde(default)]
    pub account_id: String,
    #[serde(default = "empty_secret")]
    pub key: SecretString,
    #[serde(default)]
    pub nonce: String,
}

fn empty_secret() -> SecretString {
    SecretString::from("")
}

/// Decrypted material returned to the caller. Wiped on drop; no `Debug`.
#[derive(Clone, PartialEq, Serialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct GetCredentialsOutput {
    pub credentials: CredentialBundle,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateAccountOutput {
    pub is_valid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountOutput {
    pub is_deleted: bool,
}

/// Entry point for the credential operations.
///
/// Holds no key material; every call builds and drops its own encryption service.
#[derive(Clone)]
pub struct CredentialWorkflows {
    accounts: Arc<dyn AccountDirectory>,
    store: CredentialStore,
    require_caller_nonce: bool,
}

impl CredentialWorkflows {
    pub fn new(accounts: Arc<dyn AccountDirectory>, store: CredentialStore) -> Self {
        Self {
            accounts,
            store,
            require_caller_nonce: false,
        }
    }

    /// Reject store calls that omit the nonce instead of generating one.
    pub fn require_caller_nonce(mut self, required: bool) -> Self {
        self.require_caller_nonce = required;
        self
    }

    /// Delegates account deletion to the directory. Stored envelopes are left untouched.
    pub async fn delete_account(&self, account_id: &str) -> Result<DeleteAccountOutput> {
        require_fields(&[("accountId", account_id)])?;

        let is_deleted = self
            .accounts
            .delete(account_id)
            .await
            .map_err(CredentialError::Internal)?;

        tracing::info!(account_id = %account_id, is_deleted, "Account delete processed");
        Ok(DeleteAccountOutput { is_deleted })
    }

    /// Resolves an account or fails with `NotFound`.
    async fn resolve_account(&self, account_id: &str) -> Result<Account> {
        self.accounts
            .get(account_id)
            .await
            .map_err(CredentialError::Internal)?
            .ok_or_else(|| CredentialError::NotFound(format!("account {} not found", account_id)))
    }
}

/// Fails with `InvalidData` naming every empty field.
fn require_fields(fields: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CredentialError::InvalidData(format!(
            "missing required fields: {}",
            missing.join(", ")
        )))
    }
}
