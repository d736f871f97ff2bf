use super::BlobStore;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// Non-persistent blob store backed by a concurrent map.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: DashMap<String, Vec<u8>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.blobs.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_overwrite() {
        let store = InMemoryBlobStore::new();
        assert!(store.get("a").await.unwrap().is_none());

        store.put("a", b"one".to_vec()).await.unwrap();
        store.put("a", b"two".to_vec()).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.len(), 1);
    }
}
