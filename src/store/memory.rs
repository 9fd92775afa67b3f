use super::Storage;
use crate::core::error::ConvertResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory storage backed by a HashMap
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> ConvertResult<Option<Vec<u8>>> {
        let store = self.inner.lock().await;
        let value = store.get(key).cloned();
        if value.is_some() {
            debug!("Store HIT for key: {}", key);
        } else {
            debug!("Store MISS for key: {}", key);
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> ConvertResult<()> {
        let mut store = self.inner.lock().await;
        debug!("Store PUT for key: {}", key);
        store.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_get_set() {
        let storage = MemoryStorage::new();

        // Initially, store is empty
        assert!(storage.get("key1").await.unwrap().is_none());

        storage.set("key1", b"123".to_vec()).await.unwrap();
        assert_eq!(storage.get("key1").await.unwrap(), Some(b"123".to_vec()));

        // Overwrite replaces the value
        storage.set("key1", b"456".to_vec()).await.unwrap();
        assert_eq!(storage.get("key1").await.unwrap(), Some(b"456".to_vec()));

        assert!(storage.get("key2").await.unwrap().is_none());
    }
}
