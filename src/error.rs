//! Error taxonomy shared by the credential workflows.
//!
//! The set is closed: every failure a workflow can surface is one of these
//! variants. Mapping to HTTP status codes happens in [`crate::api`].

use crate::credentials::CipherError;
use thiserror::Error;

/// Result alias used throughout the credential core.
pub type Result<T, E = CredentialError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CredentialError {
    /// Missing or malformed caller input.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Referenced account or stored blob does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Envelope failed authentication or was malformed. Carries no detail.
    #[error("decryption failed")]
    Decryption,

    /// Authenticated plaintext did not parse into the expected shape.
    #[error("decrypted data has an unexpected format")]
    DataFormat,

    /// Storage or directory failure.
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl CredentialError {
    /// Short, stable name of the variant for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CredentialError::InvalidData(_) => "invalid_data",
            CredentialError::NotFound(_) => "not_found",
            CredentialError::Decryption => "decryption",
            CredentialError::DataFormat => "data_format",
            CredentialError::Internal(_) => "internal",
        }
    }
}

impl From<CipherError> for CredentialError {
    fn from(e: CipherError) -> Self {
        match e {
            CipherError::Decryption => CredentialError::Decryption,
            CipherError::KeyLength(_) | CipherError::NonceLength(_) | CipherError::EmptyPlaintext => {
                CredentialError::InvalidData(e.to_string())
            }
            CipherError::Encryption => CredentialError::Internal(anyhow::anyhow!(e)),
        }
    }
}
