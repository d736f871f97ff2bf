use super::{require_fields, AccountKeyRequest, CredentialWorkflows, ValidateAccountOutput};
use crate::credentials::CredentialEncryptionService;
use crate::error::{CredentialError, Result};
use secrecy::ExposeSecret;
use tracing::debug;
use zeroize::Zeroizing;

impl CredentialWorkflows {
    /// Reports whether an account's stored credentials decrypt under the given material.
    ///
    /// ```text
    /// Start -> AccountResolved -> DecryptAttempted -> Done(is_valid)
    ///             (fatal)           (absorbs faults)
    /// ```
    ///
    /// # Errors
    /// * `InvalidData` - empty account id
    /// * `NotFound` - unknown account
    pub async fn validate_account(&self, request: AccountKeyRequest) -> Result<ValidateAccountOutput> {
        require_fields(&[("accountId", request.account_id.as_str())])?;

        let account = self.resolve_account(&request.account_id).await?;
        let is_valid = self
            .check_stored_credentials(&account.id, request.key.expose_secret(), &request.nonce)
            .await;

        Ok(ValidateAccountOutput { is_valid })
    }

    /// Best-effort decrypt-and-check of an account's stored envelopes.
    ///
    /// Never fails: a missing blob, bad key, tampered envelope or malformed
    /// bundle all yield `false`. One attempt, no retries.
    pub async fn check_stored_credentials(&self, account_id: &str, key: &str, nonce: &str) -> bool {
        let attempt = async {
            let service = CredentialEncryptionService::new(key, Some(nonce))?;
            let refresh_token = Zeroizing::new(service.decrypt(&self.store.get_refresh_token(account_id).await?)?);
            let bundle = service.decrypt_credentials(&self.store.get_credentials(account_id).await?)?;
            Ok::<bool, CredentialError>(!refresh_token.is_empty() && bundle.is_complete())
        };

        match attempt.await {
            Ok(valid) => valid,
            Err(e) => {
                debug!(account_id = %account_id, error_kind = e.kind(), "Stored credentials failed validation");
                false
            }
        }
    }
}
