//! Request-scoped encryption service.
//!
//! One service is built per request from the caller's key and nonce and
//! dropped when the request finishes.

use super::{encryption, CredentialBundle};
use crate::error::{CredentialError, Result};
use secrecy::{ExposeSecret, SecretSlice};
use zeroize::{Zeroize, Zeroizing};

/// Key and nonce bytes for a single request.
///
/// Not `Clone`: the material exists once and is wiped when the context drops.
#[derive(Debug)]
pub struct EncryptionContext {
    key: SecretSlice<u8>,
    nonce: SecretSlice<u8>,
    nonce_generated: bool,
}

impl EncryptionContext {
    /// Builds a context from caller-supplied strings.
    ///
    /// The key is taken as the raw UTF-8 bytes of `key`. A missing or empty
    /// `nonce` is replaced by a fresh random one.
    ///
    /// # Errors
    /// * `InvalidData` - key is not 32 bytes or nonce is not 12/16 bytes
    pub fn new(key: &str, nonce: Option<&str>) -> Result<Self> {
        let key = key.as_bytes();
        if key.len() != encryption::KEY_SIZE {
            return Err(encryption::CipherError::KeyLength(key.len()).into());
        }

        let (nonce, nonce_generated) = match nonce.filter(|n| !n.is_empty()) {
            Some(n) => {
                let bytes = n.as_bytes();
                if bytes.len() != encryption::NONCE_SIZE
                    && bytes.len() != encryption::SHORT_NONCE_SIZE
                {
                    return Err(encryption::CipherError::NonceLength(bytes.len()).into());
                }
                (bytes.to_vec(), false)
            }
            None => {
                let mut generated = encryption::generate_nonce();
                let bytes = generated.to_vec();
                generated.zeroize();
                (bytes, true)
            }
        };

        Ok(Self {
            key: SecretSlice::from(key.to_vec()),
            nonce: SecretSlice::from(nonce),
            nonce_generated,
        })
    }

    /// True when the nonce was generated server-side rather than supplied.
    pub fn nonce_was_generated(&self) -> bool {
        self.nonce_generated
    }
}

/// Encrypts and decrypts credential material under one [`EncryptionContext`].
///
/// Every call made through the same instance uses the same nonce, so the
/// bundle and refresh token of one store request share it.
#[derive(Debug)]
pub struct CredentialEncryptionService {
    context: EncryptionContext,
}

impl CredentialEncryptionService {
    pub fn new(key: &str, nonce: Option<&str>) -> Result<Self> {
        Ok(Self::from_context(EncryptionContext::new(key, nonce)?))
    }

    pub fn from_context(context: EncryptionContext) -> Self {
        Self { context }
    }

    pub fn nonce_was_generated(&self) -> bool {
        self.context.nonce_was_generated()
    }

    /// Serializes the bundle to its canonical JSON form and encrypts it.
    pub fn encrypt_credentials(&self, bundle: &CredentialBundle) -> Result<String> {
        let canonical = Zeroizing::new(
            serde_json::to_string(bundle)
                .map_err(|e| CredentialError::Internal(anyhow::Error::new(e)))?,
        );
        self.encrypt(&canonical)
    }

    /// Decrypts an envelope and parses the plaintext as a bundle.
    ///
    /// # Errors
    /// * `Decryption` - envelope failed authentication or is malformed
    /// * `DataFormat` - plaintext authenticated but is not a bundle
    pub fn decrypt_credentials(&self, envelope: &str) -> Result<CredentialBundle> {
        let plaintext = Zeroizing::new(self.decrypt(envelope)?);
        // serde_json errors can quote input, so only the kind is kept
        serde_json::from_str(&plaintext).map_err(|_| CredentialError::DataFormat)
    }

    /// Encrypts an arbitrary string, e.g. the refresh token.
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        Ok(encryption::encrypt(
            plaintext.as_bytes(),
            self.context.key.expose_secret(),
            self.context.nonce.expose_secret(),
        )?)
    }

    /// Decrypts an envelope back to a string.
    pub fn decrypt(&self, envelope: &str) -> Result<String> {
        let bytes = encryption::decrypt(
            envelope,
            self.context.key.expose_secret(),
            self.context.nonce.expose_secret(),
        )?;
        String::from_utf8(bytes).map_err(|e| {
            e.into_bytes().zeroize();
            CredentialError::DataFormat
        })
    }
}
