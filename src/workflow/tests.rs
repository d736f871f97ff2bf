use super::*;
use crate::account::AccountRegistry;
use crate::blob::{BlobStore, InMemoryBlobStore};
use crate::credentials::CredentialEncryptionService;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory blob store that counts writes.
#[derive(Default)]
struct RecordingBlobStore {
    inner: InMemoryBlobStore,
    writes: AtomicUsize,
}

impl RecordingBlobStore {
    fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value).await
    }
}

struct Fixture {
    workflows: CredentialWorkflows,
    blobs: Arc<RecordingBlobStore>,
    registry: Arc<AccountRegistry>,
}

fn fixture() -> Fixture {
    let blobs = Arc::new(RecordingBlobStore::default());
    let registry = Arc::new(AccountRegistry::new());
    registry.register("123", "Main seller").unwrap();

    let workflows = CredentialWorkflows::new(registry.clone(), CredentialStore::new(blobs.clone()));
    Fixture {
        workflows,
        blobs,
        registry,
    }
}

fn key() -> String {
    "k".repeat(32)
}

fn nonce() -> String {
    "i".repeat(16)
}

fn store_request() -> StoreCredentialsRequest {
    StoreCredentialsRequest {
        account_id: "123".to_string(),
        refresh_token: "rt".into(),
        client_id: "c".to_string(),
        client_secret: "s".into(),
        access_key_id: "a".to_string(),
        access_key_secret: "as".into(),
        role: "SELLER".to_string(),
        key: key().into(),
        nonce: Some(nonce()),
    }
}

fn key_request(account_id: &str) -> AccountKeyRequest {
    AccountKeyRequest {
        account_id: account_id.to_string(),
        key: key().into(),
        nonce: nonce(),
    }
}

fn is_envelope(s: &str) -> bool {
    let lower_hex = |seg: &str| !seg.is_empty() && seg.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    match s.split_once(':') {
        Some((ct, tag)) => lower_hex(ct) && lower_hex(tag) && tag.len() == 32,
        None => false,
    }
}

// --- store / get / validate scenario ---

#[tokio::test]
async fn test_store_get_validate_roundtrip() {
    let f = fixture();

    let stored = f.workflows.store_credentials(store_request()).await.unwrap();
    assert!(is_envelope(&stored.encrypted_credentials));
    assert!(is_envelope(&stored.encrypted_refresh_token));
    assert_eq!(f.blobs.writes(), 2);

    let fetched = f.workflows.get_credentials(key_request("123")).await.unwrap();
    assert_eq!(fetched.refresh_token, "rt");
    assert_eq!(fetched.credentials.client_id, "c");
    assert_eq!(fetched.credentials.client_secret, "s");
    assert_eq!(fetched.credentials.access_key_id, "a");
    assert_eq!(fetched.credentials.access_key_secret, "as");
    assert_eq!(fetched.credentials.role, "SELLER");

    let validated = f.workflows.validate_account(key_request("123")).await.unwrap();
    assert!(validated.is_valid);
}

#[tokio::test]
async fn test_store_persists_returned_envelopes() {
    let f = fixture();
    let stored = f.workflows.store_credentials(store_request()).await.unwrap();

    let bundle_blob = f.blobs.get("amazonsp-credentials-123").await.unwrap().unwrap();
    let token_blob = f.blobs.get("amazonsp-refreshToken-123").await.unwrap().unwrap();
    assert_eq!(String::from_utf8(bundle_blob).unwrap(), stored.encrypted_credentials);
    assert_eq!(String::from_utf8(token_blob).unwrap(), stored.encrypted_refresh_token);
}

#[tokio::test]
async fn test_store_overwrites_previous_credentials() {
    let f = fixture();
    f.workflows.store_credentials(store_request()).await.unwrap();

    let mut update = store_request();
    update.refresh_token = "rt-2".into();
    update.role = "VENDOR".to_string();
    f.workflows.store_credentials(update).await.unwrap();

    let fetched = f.workflows.get_credentials(key_request("123")).await.unwrap();
    assert_eq!(fetched.refresh_token, "rt-2");
    assert_eq!(fetched.credentials.role, "VENDOR");
}

// --- store preconditions ---

#[tokio::test]
async fn test_store_missing_required_field_writes_nothing() {
    let clears: [fn(&mut StoreCredentialsRequest); 7] = [
        |r| r.account_id.clear(),
        |r| r.refresh_token = SecretString::from(""),
        |r| r.client_id.clear(),
        |r| r.client_secret = SecretString::from(""),
        |r| r.access_key_id.clear(),
        |r| r.access_key_secret = SecretString::from(""),
        |r| r.role.clear(),
    ];

    for clear in clears {
        let f = fixture();
        let mut request = store_request();
        clear(&mut request);

        let result = f.workflows.store_credentials(request).await;
        assert!(matches!(result, Err(CredentialError::InvalidData(_))));
        assert_eq!(f.blobs.writes(), 0);
    }
}

#[tokio::test]
async fn test_store_error_names_missing_fields() {
    let f = fixture();
    let mut request = store_request();
    request.client_secret = SecretString::from("");
    request.role.clear();

    match f.workflows.store_credentials(request).await {
        Err(CredentialError::InvalidData(msg)) => {
            assert!(msg.contains("clientSecret"));
            assert!(msg.contains("role"));
        }
        other => panic!("expected InvalidData, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_store_unknown_account_writes_nothing() {
    let f = fixture();
    let mut request = store_request();
    request.account_id = "999".to_string();

    let result = f.workflows.store_credentials(request).await;
    assert!(matches!(result, Err(CredentialError::NotFound(_))));
    assert_eq!(f.blobs.writes(), 0);
}

#[tokio::test]
async fn test_store_bad_key_writes_nothing() {
    let f = fixture();
    let mut request = store_request();
    request.key = "too-short".into();

    let result = f.workflows.store_credentials(request).await;
    assert!(matches!(result, Err(CredentialError::InvalidData(_))));
    assert_eq!(f.blobs.writes(), 0);
}

#[tokio::test]
async fn test_store_without_nonce_uses_generated_nonce() {
    let f = fixture();
    let mut request = store_request();
    request.nonce = None;

    let stored = f.workflows.store_credentials(request).await.unwrap();
    assert!(is_envelope(&stored.encrypted_credentials));

    // The generated nonce is not the caller's, so the usual material cannot decrypt
    let result = f.workflows.get_credentials(key_request("123")).await;
    assert!(matches!(result, Err(CredentialError::Decryption)));
}

#[tokio::test]
async fn test_store_without_nonce_rejected_when_required() {
    let f = fixture();
    let workflows = f.workflows.clone().require_caller_nonce(true);
    let mut request = store_request();
    request.nonce = Some(String::new());

    let result = workflows.store_credentials(request).await;
    assert!(matches!(result, Err(CredentialError::InvalidData(_))));
    assert_eq!(f.blobs.writes(), 0);

    // A supplied nonce still works
    assert!(workflows.store_credentials(store_request()).await.is_ok());
}

// --- get ---

#[tokio::test]
async fn test_get_requires_key_and_nonce() {
    let f = fixture();
    f.workflows.store_credentials(store_request()).await.unwrap();

    let mut request = key_request("123");
    request.nonce.clear();
    assert!(matches!(
        f.workflows.get_credentials(request).await,
        Err(CredentialError::InvalidData(_))
    ));

    let mut request = key_request("123");
    request.key = SecretString::from("");
    assert!(matches!(
        f.workflows.get_credentials(request).await,
        Err(CredentialError::InvalidData(_))
    ));
}

#[tokio::test]
async fn test_get_unknown_account() {
    let f = fixture();
    assert!(matches!(
        f.workflows.get_credentials(key_request("999")).await,
        Err(CredentialError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_get_nothing_stored() {
    let f = fixture();
    assert!(matches!(
        f.workflows.get_credentials(key_request("123")).await,
        Err(CredentialError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_get_wrong_key_is_fatal() {
    let f = fixture();
    f.workflows.store_credentials(store_request()).await.unwrap();

    let mut request = key_request("123");
    request.key = "x".repeat(32).into();
    assert!(matches!(
        f.workflows.get_credentials(request).await,
        Err(CredentialError::Decryption)
    ));
}

#[tokio::test]
async fn test_get_has_no_partial_success() {
    let f = fixture();
    f.workflows.store_credentials(store_request()).await.unwrap();

    // Bundle intact, refresh token corrupted
    f.blobs
        .put("amazonsp-refreshToken-123", b"00:00000000000000000000000000000000".to_vec())
        .await
        .unwrap();

    assert!(matches!(
        f.workflows.get_credentials(key_request("123")).await,
        Err(CredentialError::Decryption)
    ));
}

// --- validate ---

async fn corrupt_first_byte(blobs: &RecordingBlobStore, key: &str) {
    let mut bytes = blobs.get(key).await.unwrap().unwrap();
    bytes[0] = if bytes[0] == b'0' { b'1' } else { b'0' };
    blobs.put(key, bytes).await.unwrap();
}

#[tokio::test]
async fn test_validate_corrupted_bundle_is_false() {
    let f = fixture();
    f.workflows.store_credentials(store_request()).await.unwrap();
    corrupt_first_byte(&f.blobs, "amazonsp-credentials-123").await;

    let result = f.workflows.validate_account(key_request("123")).await.unwrap();
    assert!(!result.is_valid);

    // The same corruption is fatal for get
    assert!(matches!(
        f.workflows.get_credentials(key_request("123")).await,
        Err(CredentialError::Decryption)
    ));
}

#[tokio::test]
async fn test_validate_unknown_account_is_not_found() {
    let f = fixture();
    let result = f.workflows.validate_account(key_request("never-registered")).await;
    assert!(matches!(result, Err(CredentialError::NotFound(_))));
}

#[tokio::test]
async fn test_validate_absorbs_decrypt_phase_failures() {
    let f = fixture();

    // Nothing stored yet
    assert!(!f.workflows.check_stored_credentials("123", &key(), &nonce()).await);

    f.workflows.store_credentials(store_request()).await.unwrap();
    assert!(f.workflows.check_stored_credentials("123", &key(), &nonce()).await);

    // Wrong key, wrong nonce, malformed key, missing nonce
    assert!(!f.workflows.check_stored_credentials("123", &"x".repeat(32), &nonce()).await);
    assert!(!f.workflows.check_stored_credentials("123", &key(), &"j".repeat(16)).await);
    assert!(!f.workflows.check_stored_credentials("123", "short", &nonce()).await);
    assert!(!f.workflows.check_stored_credentials("123", &key(), "").await);
}

#[tokio::test]
async fn test_validate_malformed_bundle_is_false() {
    let f = fixture();
    f.workflows.store_credentials(store_request()).await.unwrap();

    // Authenticates, but is not a bundle
    let service = CredentialEncryptionService::new(&key(), Some(&nonce())).unwrap();
    let envelope = service.encrypt("not a bundle").unwrap();
    f.blobs
        .put("amazonsp-credentials-123", envelope.into_bytes())
        .await
        .unwrap();

    let result = f.workflows.validate_account(key_request("123")).await.unwrap();
    assert!(!result.is_valid);
    assert!(matches!(
        f.workflows.get_credentials(key_request("123")).await,
        Err(CredentialError::DataFormat)
    ));
}

#[tokio::test]
async fn test_validate_incomplete_bundle_is_false() {
    let f = fixture();
    f.workflows.store_credentials(store_request()).await.unwrap();

    let service = CredentialEncryptionService::new(&key(), Some(&nonce())).unwrap();
    let incomplete = CredentialBundle {
        client_id: "c".to_string(),
        client_secret: "s".to_string(),
        access_key_id: "a".to_string(),
        access_key_secret: "as".to_string(),
        role: String::new(),
    };
    let envelope = service.encrypt_credentials(&incomplete).unwrap();
    f.blobs
        .put("amazonsp-credentials-123", envelope.into_bytes())
        .await
        .unwrap();

    assert!(!f.workflows.validate_account(key_request("123")).await.unwrap().is_valid);
}

#[tokio::test]
async fn test_validate_requires_account_id() {
    let f = fixture();
    assert!(matches!(
        f.workflows.validate_account(key_request("")).await,
        Err(CredentialError::InvalidData(_))
    ));
}

// --- delete ---

#[tokio::test]
async fn test_delete_account_delegates_to_directory() {
    let f = fixture();
    f.workflows.store_credentials(store_request()).await.unwrap();

    let first = f.workflows.delete_account("123").await.unwrap();
    assert!(first.is_deleted);
    assert_eq!(f.registry.count(), 0);

    let second = f.workflows.delete_account("123").await.unwrap();
    assert!(!second.is_deleted);

    // Envelopes are not touched by account deletion
    assert!(f.blobs.get("amazonsp-credentials-123").await.unwrap().is_some());

    // Without the account every credential operation is NotFound
    assert!(matches!(
        f.workflows.validate_account(key_request("123")).await,
        Err(CredentialError::NotFound(_))
    ));
}

#[test]
fn test_request_debug_redacts_secrets() {
    let mut request = store_request();
    request.client_secret = "debug-client-secret".into();
    request.refresh_token = "debug-refresh-token".into();

    let debug = format!("{:?} {:?}", request, key_request("123"));
    assert!(!debug.contains("debug-client-secret"));
    assert!(!debug.contains("debug-refresh-token"));
    assert!(!debug.contains(&key()));
    assert!(debug.contains("REDACTED"));
}

#[test]
fn test_request_missing_json_fields_default_to_empty() {
    let request: StoreCredentialsRequest = serde_json::from_str(r#"{"accountId":"123"}"#).unwrap();
    assert_eq!(request.account_id, "123");
    assert!(request.key.expose_secret().is_empty());
    assert!(request.refresh_token.expose_secret().is_empty());
    assert_eq!(request.nonce, None);
}

// --- logging ---

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn test_plaintext_never_logged() {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let f = fixture();
    let mut request = store_request();
    request.refresh_token = "PLAINTEXT-REFRESH-TOKEN".into();
    request.client_secret = "PLAINTEXT-CLIENT-SECRET".into();
    request.access_key_secret = "PLAINTEXT-ACCESS-SECRET".into();
    f.workflows.store_credentials(request).await.unwrap();

    // Success and every failure path of get/validate
    f.workflows.get_credentials(key_request("123")).await.unwrap();
    f.workflows.validate_account(key_request("123")).await.unwrap();

    let service = CredentialEncryptionService::new(&key(), Some(&nonce())).unwrap();
    let envelope = service.encrypt("PLAINTEXT-NOT-A-BUNDLE").unwrap();
    f.blobs
        .put("amazonsp-credentials-123", envelope.into_bytes())
        .await
        .unwrap();
    let _ = f.workflows.get_credentials(key_request("123")).await;
    let _ = f.workflows.validate_account(key_request("123")).await;

    corrupt_first_byte(&f.blobs, "amazonsp-refreshToken-123").await;
    let _ = f.workflows.get_credentials(key_request("123")).await;
    let _ = f.workflows.validate_account(key_request("123")).await;

    let output = logs.contents();
    let (key, nonce) = (key(), nonce());
    assert!(!output.is_empty(), "expected some log output");
    for secret in [
        "PLAINTEXT-REFRESH-TOKEN",
        "PLAINTEXT-CLIENT-SECRET",
        "PLAINTEXT-ACCESS-SECRET",
        "PLAINTEXT-NOT-A-BUNDLE",
        key.as_str(),
        nonce.as_str(),
    ] {
        assert!(!output.contains(secret), "log output leaked {}", secret);
    }
}
