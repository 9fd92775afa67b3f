//! Rate snapshots: TTL cache, refresh, persistence and the offline fallback.

use crate::core::clock::Clock;
use crate::core::currency::{CurrencyCode, RateKey, RateSnapshot, RateTable};
use crate::core::error::{ConvertError, ConvertResult};
use crate::core::provider::RateProvider;
use crate::store::{StoreHandle, rates_key};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Hardcoded table for first runs without network or cache.
const DEFAULT_RATES: [(&str, &str, f64); 8] = [
    ("USD", "EUR", 0.92),
    ("USD", "GBP", 0.79),
    ("USD", "JPY", 148.50),
    ("USD", "INR", 83.12),
    ("EUR", "USD", 1.09),
    ("EUR", "GBP", 0.86),
    ("GBP", "USD", 1.27),
    ("GBP", "EUR", 1.16),
];

#[derive(Debug, Clone)]
pub struct RateStoreOptions {
    pub ttl: Duration,
    /// When off, any held snapshot is served regardless of age and only
    /// [`RateStore::refresh`] goes to the network.
    pub auto_update: bool,
    /// Optional bundled JSON file with `{"rates": {"USD_EUR": 0.92, ...}}`.
    pub default_rates_path: Option<PathBuf>,
}

impl Default for RateStoreOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(30),
            auto_update: true,
            default_rates_path: None,
        }
    }
}

/// Where the rates in a [`RateView`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateOrigin {
    /// Fetched by this call.
    Live,
    /// Served from a snapshot younger than the TTL.
    Cached,
    /// Expired snapshot used because the refresh failed.
    Stale,
    /// Bundled fallback table.
    Default,
}

#[derive(Debug, Clone)]
pub struct RateView {
    pub origin: RateOrigin,
    pub table: RateTable,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Refresh failure that forced a fallback.
    pub error: Option<ConvertError>,
}

#[derive(Debug, Deserialize)]
struct BundledRates {
    rates: HashMap<String, f64>,
}

pub struct RateStore {
    provider: Arc<dyn RateProvider>,
    store: StoreHandle,
    clock: Arc<dyn Clock>,
    options: RateStoreOptions,
    snapshots: RwLock<HashMap<CurrencyCode, Arc<RateSnapshot>>>,
    restore_attempted: Mutex<HashSet<CurrencyCode>>,
    refresh_guards: Mutex<HashMap<CurrencyCode, Arc<Mutex<()>>>>,
}

impl RateStore {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        store: StoreHandle,
        clock: Arc<dyn Clock>,
        options: RateStoreOptions,
    ) -> Self {
        Self {
            provider,
            store,
            clock,
            options,
            snapshots: RwLock::new(HashMap::new()),
            restore_attempted: Mutex::new(HashSet::new()),
            refresh_guards: Mutex::new(HashMap::new()),
        }
    }

    /// Returns rates for `base`, fetching only when the held snapshot is
    /// missing or older than the TTL. A failed fetch leaves the held snapshot
    /// untouched and reports the failure.
    pub async fn get_rates(&self, base: &CurrencyCode) -> ConvertResult<Arc<RateSnapshot>> {
        self.get_rates_tagged(base).await.map(|(snapshot, _)| snapshot)
    }

    /// Fetches `base` regardless of how fresh the held snapshot is.
    pub async fn refresh(&self, base: &CurrencyCode) -> ConvertResult<Arc<RateSnapshot>> {
        let guard = self.refresh_guard(base).await;
        let _lock = guard.lock().await;
        self.fetch_and_replace(base).await
    }

    /// Never fails: live or cached rates, then the stale snapshot, then the
    /// default table.
    pub async fn rates_or_fallback(&self, base: &CurrencyCode) -> RateView {
        let error = match self.get_rates_tagged(base).await {
            Ok((snapshot, origin)) => {
                return RateView {
                    origin,
                    table: snapshot.table.clone(),
                    fetched_at: Some(snapshot.fetched_at),
                    error: None,
                };
            }
            Err(e) => e,
        };

        if let Some(stale) = self.snapshot(base).await {
            warn!(error = %error, %base, "Refresh failed, using stale rates");
            return RateView {
                origin: RateOrigin::Stale,
                table: stale.table.clone(),
                fetched_at: Some(stale.fetched_at),
                error: Some(error),
            };
        }

        warn!(error = %error, %base, "Refresh failed, using default rates");
        RateView {
            origin: RateOrigin::Default,
            table: self.default_rates(),
            fetched_at: None,
            error: Some(error),
        }
    }

    /// Fetch time of the snapshot currently held for `base`.
    pub async fn last_updated(&self, base: &CurrencyCode) -> Option<DateTime<Utc>> {
        self.snapshot(base).await.map(|s| s.fetched_at)
    }

    /// Fallback table for offline first runs. Reads the bundled file when one
    /// is configured and usable, otherwise the hardcoded table.
    pub fn default_rates(&self) -> RateTable {
        if let Some(path) = &self.options.default_rates_path {
            match load_bundled_rates(path) {
                Ok(table) => return table,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "Ignoring bundled rates file")
                }
            }
        }
        builtin_default_rates()
    }

    pub async fn persist(&self, snapshot: &RateSnapshot) -> ConvertResult<()> {
        self.store
            .set_json(&rates_key(snapshot.base.as_str()), snapshot)
            .await
    }

    pub async fn restore(&self, base: &CurrencyCode) -> ConvertResult<Option<RateSnapshot>> {
        let snapshot: Option<RateSnapshot> = self.store.get_json(&rates_key(base.as_str())).await?;
        match snapshot {
            Some(s) if &s.base != base => {
                warn!(expected = %base, found = %s.base, "Ignoring persisted snapshot for wrong base");
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn get_rates_tagged(
        &self,
        base: &CurrencyCode,
    ) -> ConvertResult<(Arc<RateSnapshot>, RateOrigin)> {
        // Callers racing on the same base wait here and then see the fresh
        // snapshot instead of issuing their own request.
        let guard = self.refresh_guard(base).await;
        let _lock = guard.lock().await;

        if let Some(snapshot) = self.snapshot(base).await {
            if self.is_fresh(&snapshot) {
                debug!(%base, "Rate cache HIT");
                return Ok((snapshot, RateOrigin::Cached));
            }
            debug!(%base, fetched_at = %snapshot.fetched_at, "Rate cache STALE");
        } else {
            debug!(%base, "Rate cache MISS");
        }

        let snapshot = self.fetch_and_replace(base).await?;
        Ok((snapshot, RateOrigin::Live))
    }

    fn is_fresh(&self, snapshot: &RateSnapshot) -> bool {
        !self.options.auto_update || snapshot.age(self.clock.now()) < self.options.ttl
    }

    /// Must be called with the refresh guard for `base` held.
    async fn fetch_and_replace(&self, base: &CurrencyCode) -> ConvertResult<Arc<RateSnapshot>> {
        let table = match self.provider.fetch_rates(base).await {
            Ok(table) => table,
            Err(e) => {
                warn!(error = %e, %base, "Failed to fetch exchange rates");
                return Err(e);
            }
        };

        let snapshot = Arc::new(RateSnapshot::new(base.clone(), table, self.clock.now()));
        self.snapshots
            .write()
            .await
            .insert(base.clone(), Arc::clone(&snapshot));
        info!(%base, count = snapshot.table.len(), "Exchange rates refreshed");

        if let Err(e) = self.persist(&snapshot).await {
            warn!(error = %e, %base, "Failed to persist exchange rates");
        }
        Ok(snapshot)
    }

    /// Snapshot held for `base` regardless of age, restoring it from storage
    /// on first access. Never goes to the network.
    pub async fn snapshot(&self, base: &CurrencyCode) -> Option<Arc<RateSnapshot>> {
        if let Some(snapshot) = self.snapshots.read().await.get(base) {
            return Some(Arc::clone(snapshot));
        }

        if !self.restore_attempted.lock().await.insert(base.clone()) {
            return None;
        }

        match self.restore(base).await {
            Ok(Some(restored)) => {
                debug!(%base, fetched_at = %restored.fetched_at, "Restored persisted rates");
                let mut snapshots = self.snapshots.write().await;
                let entry = snapshots
                    .entry(base.clone())
                    .or_insert_with(|| Arc::new(restored));
                Some(Arc::clone(entry))
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, %base, "Failed to restore persisted rates");
                None
            }
        }
    }

    async fn refresh_guard(&self, base: &CurrencyCode) -> Arc<Mutex<()>> {
        let mut guards = self.refresh_guards.lock().await;
        Arc::clone(guards.entry(base.clone()).or_default())
    }
}

pub fn builtin_default_rates() -> RateTable {
    let mut table = RateTable::new();
    for (from, to, rate) in DEFAULT_RATES {
        if let (Ok(from), Ok(to)) = (CurrencyCode::new(from), CurrencyCode::new(to)) {
            // Constants are valid codes with positive rates
            let _ = table.insert(RateKey::new(from, to), rate);
        }
    }
    table
}

fn load_bundled_rates(path: &std::path::Path) -> ConvertResult<RateTable> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConvertError::StorageFailure(format!("cannot read bundled rates: {e}")))?;
    let bundled: BundledRates = serde_json::from_str(&text)
        .map_err(|e| ConvertError::ParseFailure(format!("bad bundled rates: {e}")))?;

    let mut table = RateTable::new();
    for (pair, rate) in bundled.rates {
        table.insert(RateKey::parse(&pair)?, rate)?;
    }
    if table.is_empty() {
        return Err(ConvertError::ParseFailure("bundled rates are empty".to_string()));
    }
    Ok(table)
}
