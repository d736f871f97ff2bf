//! Encrypted storage for selling-partner API credentials.
//!
//! Each account owns two ciphertext blobs: the credential bundle and the OAuth
//! refresh token. Both are sealed with AES-256-GCM under a key and nonce the
//! caller supplies per request; nothing here keeps key material between calls.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   CredentialEncryptionService            │
//! │  - request-scoped key + nonce            │
//! │  - bundle <-> canonical JSON             │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!    (encrypt)            (decrypt)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       Envelope codec                     │
//! │  - AES-256-GCM                           │
//! │  - <ciphertext-hex>:<tag-hex>            │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       CredentialStore                    │
//! │  - {prefix}-credentials-{account}        │
//! │  - {prefix}-refreshToken-{account}       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use spvault::blob::InMemoryBlobStore;
//! use spvault::credentials::{CredentialBundle, CredentialEncryptionService, CredentialStore};
//! use std::sync::Arc;
//!
//! # async fn run() -> spvault::Result<()> {
//! let store = CredentialStore::new(Arc::new(InMemoryBlobStore::new()));
//! let service = CredentialEncryptionService::new(&"k".repeat(32), Some(&"i".repeat(16)))?;
//!
//! let bundle = CredentialBundle {
//!     client_id: "amzn1.application-oa2-client.example".to_string(),
//!     client_secret: "client-secret".to_string(),
//!     access_key_id: "AKIAEXAMPLE".to_string(),
//!     access_key_secret: "access-key-secret".to_string(),
//!     role: "arn:aws:iam::123456789012:role/SellingPartner".to_string(),
//! };
//! store.save_credentials("123", &service.encrypt_credentials(&bundle)?).await?;
//!
//! let restored = service.decrypt_credentials(&store.get_credentials("123").await?)?;
//! assert_eq!(restored, bundle);
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! - Ciphertext only at rest; plaintext lives inside a single request
//! - Tampered or mismatched envelopes fail with one indistinguishable error
//! - `Debug` output of bundles and encryption contexts is redacted

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

mod encryption;
mod service;
mod storage;

pub use encryption::{
    decrypt, encrypt, generate_nonce, CipherError, KEY_SIZE, NONCE_SIZE, SHORT_NONCE_SIZE,
    TAG_SIZE,
};
pub use service::{CredentialEncryptionService, EncryptionContext};
pub use storage::{CredentialStore, DEFAULT_KEY_PREFIX};

/// API client and access-key secrets for one selling-partner account.
///
/// Field order is the canonical serialization order and must not change:
/// stored envelopes are authenticated over the exact JSON text.
///
/// Every field is wiped when the bundle drops.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct CredentialBundle {
    /// Marketplace app (LWA) client id
    pub client_id: String,

    /// Marketplace app (LWA) client secret
    pub client_secret: String,

    /// IAM access key id
    pub access_key_id: String,

    /// IAM access key secret
    pub access_key_secret: String,

    /// Selling-partner IAM role identifier
    pub role: String,
}

impl CredentialBundle {
    /// True when every field carries a value.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Names (wire form) of the fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("clientId", &self.client_id),
            ("clientSecret", &self.client_secret),
            ("accessKeyId", &self.access_key_id),
            ("accessKeySecret", &self.access_key_secret),
            ("role", &self.role),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}
