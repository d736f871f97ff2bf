use super::{require_fields, AccountKeyRequest, CredentialWorkflows, GetCredentialsOutput};
use crate::credentials::CredentialEncryptionService;
use crate::error::Result;
use secrecy::ExposeSecret;
use tracing::debug;

impl CredentialWorkflows {
    /// Reads and decrypts both envelopes for an account.
    ///
    /// There is no partial result: if either envelope is missing or fails to
    /// decrypt, the whole call fails.
    ///
    /// # Errors
    /// * `InvalidData` - account id, key or nonce missing or mis-sized
    /// * `NotFound` - unknown account, or nothing stored for it
    /// * `Decryption` / `DataFormat` - envelope rejected
    pub async fn get_credentials(&self, request: AccountKeyRequest) -> Result<GetCredentialsOutput> {
        require_fields(&[
            ("accountId", request.account_id.as_str()),
            ("key", request.key.expose_secret()),
            ("nonce", request.nonce.as_str()),
        ])?;

        let account = self.resolve_account(&request.account_id).await?;
        let service = CredentialEncryptionService::new(request.key.expose_secret(), Some(request.nonce.as_str()))?;

        let credentials = service.decrypt_credentials(&self.store.get_credentials(&account.id).await?)?;
        let refresh_token = service.decrypt(&self.store.get_refresh_token(&account.id).await?)?;

        debug!(account_id = %account.id, "Decrypted stored credentials");

        Ok(GetCredentialsOutput {
            credentials,
            refresh_token,
        })
    }
}
