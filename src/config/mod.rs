use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;

pub use crate::blob::NatsConfig;
use crate::credentials::DEFAULT_KEY_PREFIX;

/// Complete vault configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub encryption: EncryptionConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Bearer token required on every route. None (or empty) = open (dev mode).
    #[serde(default, deserialize_with = "empty_as_none")]
    pub api_token: Option<String>,
}

/// Treats `key = ""` the same as an absent key.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            api_token: None,
        }
    }
}

/// Which blob backend holds the envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sqlite,
    Nats,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            "nats" => Ok(StorageBackend::Nats),
            other => anyhow::bail!("unknown storage backend '{}'", other),
        }
    }
}

/// Blob storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_sqlite_path() -> String {
    "spvault_blobs.db".to_string()
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            sqlite_path: default_sqlite_path(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Account directory persistence. No path = accounts live in memory only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountsConfig {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncryptionConfig {
    /// Reject store requests without a nonce instead of generating one
    #[serde(default)]
    pub require_caller_nonce: bool,
}

impl VaultConfig {
    /// Loads the file named by `SPVAULT_CONFIG` (if set), then applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("SPVAULT_CONFIG") {
            Ok(path) => load_config(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overrides fields from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SPVAULT_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = lookup("SPVAULT_API_TOKEN") {
            self.server.api_token = Some(v).filter(|t| !t.is_empty());
        }
        if let Some(v) = lookup("SPVAULT_STORAGE_BACKEND") {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = lookup("SPVAULT_SQLITE_PATH") {
            self.storage.sqlite_path = v;
        }
        if let Some(v) = lookup("SPVAULT_ACCOUNTS_DB") {
            self.accounts.db_path = Some(v).filter(|p| !p.is_empty());
        }
        if let Some(v) = lookup("NATS_URL") {
            self.nats.url = v;
        }
        if let Some(v) = lookup("SPVAULT_NATS_BUCKET") {
            self.nats.bucket = v;
        }
        if let Some(v) = lookup("SPVAULT_REQUIRE_CALLER_NONCE") {
            self.encryption.require_caller_nonce = v
                .parse()
                .with_context(|| format!("SPVAULT_REQUIRE_CALLER_NONCE must be true or false, got '{}'", v))?;
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<VaultConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: VaultConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config file {}", path))?;
    Ok(config)
}
