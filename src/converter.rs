//! Conversion against a rate table, plus the bounded conversion history.

use crate::core::clock::Clock;
use crate::core::currency::{CurrencyCode, RateTable};
use crate::core::error::{ConvertError, ConvertResult};
use crate::rates::{RateOrigin, RateStore};
use crate::store::{HISTORY_KEY, StoreHandle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const DEFAULT_HISTORY_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub amount: f64,
    pub from: CurrencyCode,
    pub converted: f64,
    pub to: CurrencyCode,
}

/// Outcome of [`Converter::convert_current`].
#[derive(Debug, Clone)]
pub struct Conversion {
    pub entry: HistoryEntry,
    pub rate: f64,
    pub origin: RateOrigin,
    pub rates_updated_at: Option<DateTime<Utc>>,
    /// Refresh failure behind a stale or default origin.
    pub refresh_error: Option<ConvertError>,
}

#[derive(Debug, Clone)]
pub struct ConverterOptions {
    pub pivot: CurrencyCode,
    pub history_limit: usize,
}

/// Parses user input into a convertible amount.
pub fn parse_amount(text: &str) -> ConvertResult<f64> {
    let amount: f64 = text
        .trim()
        .parse()
        .map_err(|_| ConvertError::InvalidAmount(format!("{text:?} is not a number")))?;
    validate_amount(amount)?;
    Ok(amount)
}

fn validate_amount(amount: f64) -> ConvertResult<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ConvertError::InvalidAmount(format!(
            "{amount} must be a positive number"
        )));
    }
    Ok(())
}

pub struct Converter {
    rates: Arc<RateStore>,
    store: StoreHandle,
    clock: Arc<dyn Clock>,
    options: ConverterOptions,
    history: Mutex<Vec<HistoryEntry>>,
}

impl Converter {
    /// Builds a converter and loads any persisted history.
    pub async fn open(
        rates: Arc<RateStore>,
        store: StoreHandle,
        clock: Arc<dyn Clock>,
        options: ConverterOptions,
    ) -> Self {
        let mut history = match store.get_json::<Vec<HistoryEntry>>(HISTORY_KEY).await {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to load conversion history");
                Vec::new()
            }
        };
        history.truncate(options.history_limit);
        debug!(entries = history.len(), "Loaded conversion history");

        Self {
            rates,
            store,
            clock,
            options,
            history: Mutex::new(history),
        }
    }

    pub fn pivot(&self) -> &CurrencyCode {
        &self.options.pivot
    }

    /// Multiplier for one unit of `from`: identity, then a direct hit, then a
    /// single hop through the pivot. Inverse rates are never derived.
    pub fn rate(
        &self,
        from: &CurrencyCode,
        to: &CurrencyCode,
        table: &RateTable,
    ) -> ConvertResult<f64> {
        if from == to {
            return Ok(1.0);
        }
        if let Some(rate) = table.get(from, to) {
            return Ok(rate);
        }
        let pivot = &self.options.pivot;
        let unavailable = || ConvertError::RateUnavailable {
            from: from.clone(),
            to: to.clone(),
        };
        match (table.get(from, pivot), table.get(pivot, to)) {
            (Some(r1), Some(r2)) => {
                debug!(%from, %to, %pivot, "Converting through pivot");
                let rate = r1 * r2;
                if rate.is_finite() {
                    Ok(rate)
                } else {
                    Err(unavailable())
                }
            }
            _ => Err(unavailable()),
        }
    }

    /// `amount` in `to`. Fails rather than return a result that is not a
    /// finite number.
    pub fn convert(
        &self,
        amount: f64,
        from: &CurrencyCode,
        to: &CurrencyCode,
        table: &RateTable,
    ) -> ConvertResult<f64> {
        validate_amount(amount)?;
        let converted = amount * self.rate(from, to, table)?;
        if !converted.is_finite() {
            return Err(ConvertError::InvalidAmount(format!(
                "{amount} {from} is too large to convert to {to}"
            )));
        }
        Ok(converted)
    }

    /// Converts with the best rates available for `from` and records the
    /// result. Rates are requested with the source currency as the base.
    pub async fn convert_current(
        &self,
        amount: f64,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> ConvertResult<Conversion> {
        validate_amount(amount)?;

        let view = self.rates.rates_or_fallback(from).await;
        let rate = self.rate(from, to, &view.table)?;
        let converted = self.convert(amount, from, to, &view.table)?;

        let entry = HistoryEntry {
            timestamp: self.clock.now(),
            amount,
            from: from.clone(),
            converted,
            to: to.clone(),
        };
        self.record_history(entry.clone()).await;

        Ok(Conversion {
            entry,
            rate,
            origin: view.origin,
            rates_updated_at: view.fetched_at,
            refresh_error: view.error,
        })
    }

    /// Prepends `entry`, drops the oldest entries past the limit, and persists.
    pub async fn record_history(&self, entry: HistoryEntry) {
        let mut history = self.history.lock().await;
        history.insert(0, entry);
        history.truncate(self.options.history_limit);
        // Saved while the lock is held
        self.save_history(&history).await;
    }

    pub async fn clear_history(&self) {
        let mut history = self.history.lock().await;
        history.clear();
        self.save_history(&history).await;
    }

    /// Most recent first.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().await.clone()
    }

    async fn save_history(&self, history: &[HistoryEntry]) {
        if let Err(e) = self.store.set_json(HISTORY_KEY, history).await {
            warn!(error = %e, "Failed to persist conversion history");
        }
    }
}
