use super::BlobStore;
use anyhow::{Context, Result};
use async_nats::jetstream::{self, kv};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

/// NATS configuration
#[derive(Clone, Debug, Deserialize)]
pub struct NatsConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
}

fn default_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_bucket() -> String {
    "SPVAULT_CREDENTIALS".to_string()
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            bucket: default_bucket(),
        }
    }
}

/// Blob store backed by a JetStream key-value bucket.
pub struct NatsBlobStore {
    store: kv::Store,
}

impl NatsBlobStore {
    /// Connect to NATS and open (or create) the key-value bucket
    pub async fn connect(config: &NatsConfig) -> Result<Self> {
        info!("Connecting to NATS at {}", config.url);

        let client = async_nats::connect(&config.url)
            .await
            .context("Failed to connect to NATS")?;

        let jetstream = jetstream::new(client);

        let store = match jetstream.get_key_value(&config.bucket).await {
            Ok(store) => {
                info!("Bucket '{}' already exists", config.bucket);
                store
            }
            Err(_) => {
                info!("Bucket '{}' does not exist, creating...", config.bucket);
                jetstream
                    .create_key_value(kv::Config {
                        bucket: config.bucket.clone(),
                        description: "Encrypted selling-partner credentials".to_string(),
                        // Overwrites replace wholesale; no history is kept
                        history: 1,
                        storage: jetstream::stream::StorageType::File,
                        ..Default::default()
                    })
                    .await
                    .context("Failed to create JetStream key-value bucket")?
            }
        };

        Ok(Self { store })
    }
}

#[async_trait]
impl BlobStore for NatsBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .store
            .get(key)
            .await
            .with_context(|| format!("Failed to read blob {}", key))?;
        Ok(value.map(|bytes| bytes.to_vec()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.store
            .put(key, value.into())
            .await
            .with_context(|| format!("Failed to write blob {}", key))?;
        Ok(())
    }
}
