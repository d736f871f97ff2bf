use anyhow::{Context, Result};
use spvault::account::{AccountRegistry, AccountStore};
use spvault::api::{create_router, AppState};
use spvault::blob::{BlobStore, InMemoryBlobStore, NatsBlobStore, SqliteBlobStore};
use spvault::config::{StorageBackend, VaultConfig};
use spvault::credentials::CredentialStore;
use spvault::workflow::CredentialWorkflows;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spvault=info".into()),
        )
        .init();

    info!("spvault starting...");

    let config = VaultConfig::load().context("Failed to load configuration")?;
    info!(
        bind_addr = %config.server.bind_addr,
        backend = ?config.storage.backend,
        auth_enabled = config.server.api_token.is_some(),
        require_caller_nonce = config.encryption.require_caller_nonce,
        "Configuration loaded"
    );

    let blobs: Arc<dyn BlobStore> = match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory blob store; envelopes are lost on restart");
            Arc::new(InMemoryBlobStore::new())
        }
        StorageBackend::Sqlite => Arc::new(
            SqliteBlobStore::new(&config.storage.sqlite_path)
                .context("Failed to open SQLite blob store")?,
        ),
        StorageBackend::Nats => Arc::new(
            NatsBlobStore::connect(&config.nats)
                .await
                .context("Failed to open NATS blob store")?,
        ),
    };

    let registry = match &config.accounts.db_path {
        Some(path) => {
            let store = AccountStore::new(path).context("Failed to open account database")?;
            Arc::new(AccountRegistry::with_store(Arc::new(store))?)
        }
        None => Arc::new(AccountRegistry::new()),
    };
    info!(accounts = registry.count(), "Account registry initialized");

    let workflows = CredentialWorkflows::new(
        registry.clone(),
        CredentialStore::with_prefix(blobs, config.storage.key_prefix.clone()),
    )
    .require_caller_nonce(config.encryption.require_caller_nonce);

    let router = create_router(AppState {
        workflows,
        registry,
        api_token: config.server.api_token.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Vault API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Vault API server error");
        }
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("spvault stopped");

    Ok(())
}
