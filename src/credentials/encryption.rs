//! AES-256-GCM envelope codec.
//!
//! Ciphertext and authentication tag are hex-encoded and joined with a single
//! colon: `<ciphertext-hex>:<tag-hex>`. The key and nonce are supplied by the
//! caller on every call and never stored here.

use aes_gcm::{
    aead::{
        self,
        consts::{U12, U16},
        Aead, KeyInit,
    },
    aes::Aes256,
    AesGcm,
};
use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

/// Size of the encryption key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Size of the nonce generated when the caller supplies none
pub const NONCE_SIZE: usize = 16;

/// Size of the standard 96-bit GCM nonce, also accepted from callers
pub const SHORT_NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Separator between the ciphertext and tag segments
const SEGMENT_SEPARATOR: char = ':';

type Aes256Gcm96 = AesGcm<Aes256, U12>;
type Aes256Gcm128 = AesGcm<Aes256, U16>;

/// Codec errors.
///
/// Every data fault on the decrypt path collapses into [`CipherError::Decryption`]
/// so callers cannot tell a bad tag from a malformed envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("encryption key must be {} bytes, got {} bytes", KEY_SIZE, .0)]
    KeyLength(usize),

    #[error("nonce must be {} or {} bytes, got {} bytes", SHORT_NONCE_SIZE, NONCE_SIZE, .0)]
    NonceLength(usize),

    #[error("plaintext must not be empty")]
    EmptyPlaintext,

    #[error("encryption failed")]
    Encryption,

    #[error("decryption failed")]
    Decryption,
}

/// Generates a random nonce from the OS CSPRNG.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Encrypts `plaintext` and returns the `<ciphertext-hex>:<tag-hex>` envelope.
///
/// # Errors
/// * `KeyLength` / `NonceLength` - key or nonce has the wrong size
/// * `EmptyPlaintext` - nothing to encrypt (an empty ciphertext segment is not a valid envelope)
pub fn encrypt(plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<String, CipherError> {
    check_material(key, nonce)?;
    if plaintext.is_empty() {
        return Err(CipherError::EmptyPlaintext);
    }

    // aes-gcm appends the tag to the ciphertext
    let mut sealed = match nonce.len() {
        SHORT_NONCE_SIZE => seal::<Aes256Gcm96>(plaintext, key, nonce)?,
        _ => seal::<Aes256Gcm128>(plaintext, key, nonce)?,
    };
    let tag = sealed.split_off(sealed.len() - TAG_SIZE);

    Ok(format!(
        "{}{}{}",
        hex::encode(&sealed),
        SEGMENT_SEPARATOR,
        hex::encode(tag)
    ))
}

/// Decrypts an envelope produced by [`encrypt`].
///
/// # Errors
/// * `KeyLength` / `NonceLength` - key or nonce has the wrong size
/// * `Decryption` - malformed envelope, wrong key, wrong nonce, or tampered data
pub fn decrypt(envelope: &str, key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CipherError> {
    check_material(key, nonce)?;

    let payload = parse_envelope(envelope).ok_or(CipherError::Decryption)?;

    match nonce.len() {
        SHORT_NONCE_SIZE => open::<Aes256Gcm96>(&payload, key, nonce),
        _ => open::<Aes256Gcm128>(&payload, key, nonce),
    }
}

fn check_material(key: &[u8], nonce: &[u8]) -> Result<(), CipherError> {
    if key.len() != KEY_SIZE {
        return Err(CipherError::KeyLength(key.len()));
    }
    if nonce.len() != NONCE_SIZE && nonce.len() != SHORT_NONCE_SIZE {
        return Err(CipherError::NonceLength(nonce.len()));
    }
    Ok(())
}

/// Splits and decodes an envelope into `ciphertext || tag`.
fn parse_envelope(envelope: &str) -> Option<Vec<u8>> {
    let (ciphertext_hex, tag_hex) = envelope.split_once(SEGMENT_SEPARATOR)?;

    // Lowercase only: accepting `A` for `a` would let a flipped case bit decrypt cleanly
    if !is_lower_hex(ciphertext_hex) || !is_lower_hex(tag_hex) {
        return None;
    }

    let mut payload = hex::decode(ciphertext_hex).ok()?;
    let tag = hex::decode(tag_hex).ok()?;
    if tag.len() != TAG_SIZE {
        return None;
    }

    payload.extend_from_slice(&tag);
    Some(payload)
}

fn is_lower_hex(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn seal<C: Aead + KeyInit>(plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = C::new_from_slice(key).map_err(|_| CipherError::KeyLength(key.len()))?;
    cipher
        .encrypt(aead::Nonce::<C>::from_slice(nonce), plaintext)
        .map_err(|_| CipherError::Encryption)
}

fn open<C: Aead + KeyInit>(payload: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = C::new_from_slice(key).map_err(|_| CipherError::KeyLength(key.len()))?;
    cipher
        .decrypt(aead::Nonce::<C>::from_slice(nonce), payload)
        .map_err(|_| CipherError::Decryption)
}
