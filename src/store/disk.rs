use super::Storage;
use crate::core::error::{ConvertError, ConvertResult};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const PARTITION: &str = "fxconv";

fn storage_err(e: fjall::Error) -> ConvertError {
    ConvertError::StorageFailure(e.to_string())
}

/// fjall-backed storage. Every write is synced so a crash right after a
/// conversion does not lose it.
pub struct DiskStorage {
    keyspace: Arc<Keyspace>,
    partition: PartitionHandle,
}

impl DiskStorage {
    pub fn open(path: &Path) -> ConvertResult<Self> {
        std::fs::create_dir_all(path).map_err(|e| {
            ConvertError::StorageFailure(format!("cannot create {}: {e}", path.display()))
        })?;

        let keyspace = fjall::Config::new(path.join("store"))
            .open()
            .map_err(storage_err)?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .map_err(storage_err)?;
        debug!(path = %path.display(), "Opened disk storage");

        Ok(Self {
            keyspace: Arc::new(keyspace),
            partition,
        })
    }
}

#[async_trait]
impl Storage for DiskStorage {
    async fn get(&self, key: &str) -> ConvertResult<Option<Vec<u8>>> {
        let value = self.partition.get(key).map_err(storage_err)?;
        if value.is_some() {
            debug!("Store HIT for key: {}", key);
        } else {
            debug!("Store MISS for key: {}", key);
        }
        Ok(value.map(|slice| slice.to_vec()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> ConvertResult<()> {
        self.partition.insert(key, value).map_err(storage_err)?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .map_err(storage_err)?;
        debug!("Store PUT for key: {}", key);
        Ok(())
    }
}
