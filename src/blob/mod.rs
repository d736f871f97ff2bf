//! Blob storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite table keyed by blob name
//! - `nats`: NATS JetStream key-value bucket

mod memory;
mod nats;
mod sqlite;

pub use memory::InMemoryBlobStore;
pub use nats::{NatsBlobStore, NatsConfig};
pub use sqlite::SqliteBlobStore;

use anyhow::Result;
use async_trait::async_trait;

/// Opaque byte storage addressed by string key.
///
/// A single `put` or `get` is atomic; nothing spans multiple keys.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns the stored bytes, or `None` if the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
}
