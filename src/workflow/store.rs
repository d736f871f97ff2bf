use super::{require_fields, CredentialWorkflows, StoreCredentialsOutput, StoreCredentialsRequest};
use crate::credentials::{CredentialBundle, CredentialEncryptionService};
use crate::error::{CredentialError, Result};
use secrecy::ExposeSecret;
use tracing::{info, warn};

impl CredentialWorkflows {
    /// Encrypts and persists an account's credential bundle and refresh token.
    ///
    /// Validation and account resolution happen before any write. Both
    /// envelopes are produced by one service instance and so share a nonce.
    ///
    /// # Errors
    /// * `InvalidData` - a required field is empty, or key/nonce has the wrong size
    /// * `NotFound` - the account is not in the directory
    /// * `Internal` - blob store failure
    pub async fn store_credentials(
        &self,
        request: StoreCredentialsRequest,
    ) -> Result<StoreCredentialsOutput> {
        require_fields(&[
            ("accountId", request.account_id.as_str()),
            ("refreshToken", request.refresh_token.expose_secret()),
            ("clientId", request.client_id.as_str()),
            ("clientSecret", request.client_secret.expose_secret()),
            ("accessKeyId", request.access_key_id.as_str()),
            ("accessKeySecret", request.access_key_secret.expose_secret()),
            ("role", request.role.as_str()),
        ])?;

        let nonce = request.nonce.as_deref().filter(|n| !n.is_empty());
        if nonce.is_none() && self.require_caller_nonce {
            return Err(CredentialError::InvalidData(
                "nonce is required when storing credentials".to_string(),
            ));
        }

        let account = self.resolve_account(&request.account_id).await?;

        let service = CredentialEncryptionService::new(request.key.expose_secret(), nonce)?;
        if service.nonce_was_generated() {
            warn!(
                account_id = %account.id,
                "No nonce supplied; stored envelopes can only be decrypted with the generated nonce, which is not returned"
            );
        }

        let bundle = CredentialBundle {
            client_id: request.client_id,
            client_secret: request.client_secret.expose_secret().to_string(),
            access_key_id: request.access_key_id,
            access_key_secret: request.access_key_secret.expose_secret().to_string(),
            role: request.role,
        };

        let encrypted_credentials = service.encrypt_credentials(&bundle)?;
        let encrypted_refresh_token = service.encrypt(request.refresh_token.expose_secret())?;

        self.store
            .save_credentials(&account.id, &encrypted_credentials)
            .await?;
        self.store
            .save_refresh_token(&account.id, &encrypted_refresh_token)
            .await?;

        info!(account_id = %account.id, "Stored encrypted credentials");

        Ok(StoreCredentialsOutput {
            encrypted_credentials,
            encrypted_refresh_token,
        })
    }
}
