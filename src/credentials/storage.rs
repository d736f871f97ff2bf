//! Ciphertext persistence on top of a [`BlobStore`].
//!
//! Stores two envelopes per account under deterministic keys. The store never
//! sees plaintext; it moves envelope strings in and out.

use crate::blob::BlobStore;
use crate::error::{CredentialError, Result};
use std::sync::Arc;
use tracing::debug;

/// Key prefix used when none is configured
pub const DEFAULT_KEY_PREFIX: &str = "amazonsp";

/// Per-account envelope repository.
///
/// # Key layout
/// ```text
/// {prefix}-credentials-{account_id}    credential bundle envelope
/// {prefix}-refreshToken-{account_id}   refresh token envelope
/// ```
///
/// The two keys are written independently; a concurrent reader can observe
/// one new and one old envelope.
#[derive(Clone)]
pub struct CredentialStore {
    blobs: Arc<dyn BlobStore>,
    prefix: String,
}

impl CredentialStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self::with_prefix(blobs, DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(blobs: Arc<dyn BlobStore>, prefix: impl Into<String>) -> Self {
        Self {
            blobs,
            prefix: prefix.into(),
        }
    }

    pub fn credentials_key(&self, account_id: &str) -> String {
        format!("{}-credentials-{}", self.prefix, account_id)
    }

    pub fn refresh_token_key(&self, account_id: &str) -> String {
        format!("{}-refreshToken-{}", self.prefix, account_id)
    }

    /// Overwrites the credential bundle envelope for an account.
    pub async fn save_credentials(&self, account_id: &str, envelope: &str) -> Result<()> {
        self.put(&self.credentials_key(account_id), envelope).await
    }

    /// Reads the credential bundle envelope.
    ///
    /// # Errors
    /// * `NotFound` - nothing stored for this account
    pub async fn get_credentials(&self, account_id: &str) -> Result<String> {
        self.get(&self.credentials_key(account_id)).await
    }

    /// Overwrites the refresh token envelope for an account.
    pub async fn save_refresh_token(&self, account_id: &str, envelope: &str) -> Result<()> {
        self.put(&self.refresh_token_key(account_id), envelope).await
    }

    /// Reads the refresh token envelope.
    ///
    /// # Errors
    /// * `NotFound` - nothing stored for this account
    pub async fn get_refresh_token(&self, account_id: &str) -> Result<String> {
        self.get(&self.refresh_token_key(account_id)).await
    }

    async fn put(&self, key: &str, envelope: &str) -> Result<()> {
        self.blobs
            .put(key, envelope.as_bytes().to_vec())
            .await
            .map_err(CredentialError::Internal)?;
        debug!(key = %key, "Blob written");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<String> {
        let bytes = self
            .blobs
            .get(key)
            .await
            .map_err(CredentialError::Internal)?
            .ok_or_else(|| CredentialError::NotFound(format!("blob {} does not exist", key)))?;

        // Non-UTF-8 bytes cannot be an envelope; let the codec reject them
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
