pub mod disk;
pub mod memory;

use crate::core::error::{ConvertError, ConvertResult};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

pub use disk::DiskStorage;
pub use memory::MemoryStorage;

pub const HISTORY_KEY: &str = "history";
pub const SETTINGS_KEY: &str = "settings";

pub fn rates_key(base: &str) -> String {
    format!("rates/{base}")
}

/// Durable byte-oriented key-value storage.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> ConvertResult<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> ConvertResult<()>;
}

/// Typed JSON access over a [`Storage`].
///
/// The first failed read or write of the backing storage flips the handle
/// into in-memory-only mode for the rest of the session: later reads return
/// nothing and later writes are dropped. A stored value that fails to decode
/// only fails its own read.
#[derive(Clone)]
pub struct StoreHandle {
    inner: Arc<dyn Storage>,
    degraded: Arc<AtomicBool>,
}

impl StoreHandle {
    pub fn new(inner: Arc<dyn Storage>) -> Self {
        Self {
            inner,
            degraded: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle backed by process memory only.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    fn degrade(&self, err: &ConvertError) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            warn!(error = %err, "Storage unavailable, continuing in memory only");
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> ConvertResult<Option<T>> {
        if self.is_degraded() {
            debug!(key, "Storage degraded, skipping read");
            return Ok(None);
        }

        let bytes = match self.inner.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => {
                self.degrade(&e);
                return Err(e);
            }
        };
        // A value that no longer decodes only invalidates its own key
        serde_json::from_slice(&bytes).map(Some).map_err(|e| {
            warn!(key, error = %e, "Ignoring undecodable stored value");
            ConvertError::StorageFailure(format!("corrupt value at {key}: {e}"))
        })
    }

    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> ConvertResult<()> {
        if self.is_degraded() {
            debug!(key, "Storage degraded, skipping write");
            return Ok(());
        }

        let bytes = serde_json::to_vec(value)
            .map_err(|e| ConvertError::StorageFailure(format!("cannot encode {key}: {e}")))?;
        let res = self.inner.set(key, bytes).await;
        if let Err(e) = &res {
            self.degrade(e);
        }
        res
    }
}
