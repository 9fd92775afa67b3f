//! User-adjustable settings persisted next to the rate cache.

use crate::core::config::AppConfig;
use crate::core::currency::CurrencyCode;
use crate::core::error::ConvertResult;
use crate::store::{SETTINGS_KEY, StoreHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub base_currency: CurrencyCode,
    pub auto_update: bool,
    pub update_interval_minutes: u32,
}

impl Settings {
    pub const DEFAULT_INTERVAL_MINUTES: u32 = 30;

    /// Settings derived from the config file, used until the user saves
    /// their own.
    pub fn from_config(config: &AppConfig) -> ConvertResult<Self> {
        Ok(Self {
            base_currency: config.base_currency.parse()?,
            auto_update: true,
            update_interval_minutes: Self::DEFAULT_INTERVAL_MINUTES,
        })
    }

    /// Loads saved settings, falling back to `defaults` when nothing is
    /// stored or the store cannot be read.
    pub async fn load(store: &StoreHandle, defaults: Settings) -> Self {
        match store.get_json::<Settings>(SETTINGS_KEY).await {
            Ok(Some(saved)) => {
                debug!(?saved, "Loaded saved settings");
                saved
            }
            Ok(None) => defaults,
            Err(e) => {
                warn!(error = %e, "Failed to load settings, using defaults");
                defaults
            }
        }
    }

    pub async fn save(&self, store: &StoreHandle) -> ConvertResult<()> {
        store.set_json(SETTINGS_KEY, self).await
    }

    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.update_interval_minutes))
    }
}
