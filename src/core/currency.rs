//! Currency codes, rate keys and rate tables

use crate::core::error::{ConvertError, ConvertResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

/// Currencies offered by the CLI pickers.
pub const SUPPORTED_CURRENCIES: [&str; 24] = [
    "USD", "EUR", "GBP", "JPY", "AUD", "CAD", "CHF", "CNY", "INR", "SGD", "MYR", "IDR", "KRW",
    "THB", "VND", "PHP", "BRL", "RUB", "ZAR", "AED", "MXN", "TRY", "NZD", "HKD",
];

/// An ISO-4217 style code, always stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: &str) -> ConvertResult<Self> {
        let code = code.trim();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConvertError::InvalidCurrency(code.to_string()));
        }
        Ok(Self(code.to_ascii_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = ConvertError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Ordered currency pair. `A -> B` and `B -> A` are distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateKey {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl RateKey {
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self { from, to }
    }

    /// Parses the `FROM_TO` form used by bundled rate files.
    pub fn parse(pair: &str) -> ConvertResult<Self> {
        let (from, to) = pair
            .split_once('_')
            .ok_or_else(|| ConvertError::InvalidCurrency(pair.to_string()))?;
        Ok(Self::new(from.parse()?, to.parse()?))
    }
}

impl Display for RateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.from, self.to)
    }
}

/// Serialized form of one table row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateEntry {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: f64,
}

/// Flat mapping from ordered pair to a positive multiplier,
/// `amount_in_from * rate = amount_in_to`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<RateEntry>", into = "Vec<RateEntry>")]
pub struct RateTable {
    rates: BTreeMap<RateKey, f64>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a rate, rejecting values that are not finite and positive.
    pub fn insert(&mut self, key: RateKey, rate: f64) -> ConvertResult<()> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConvertError::ParseFailure(format!(
                "rate for {key} must be positive, got {rate}"
            )));
        }
        self.rates.insert(key, rate);
        Ok(())
    }

    pub fn get(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<f64> {
        self.rates.get(&RateKey::new(from.clone(), to.clone())).copied()
    }

    pub fn contains(&self, from: &CurrencyCode, to: &CurrencyCode) -> bool {
        self.get(from, to).is_some()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Whether any pair in the table mentions `code`.
    pub fn mentions(&self, code: &CurrencyCode) -> bool {
        self.rates.keys().any(|k| &k.from == code || &k.to == code)
    }
}

impl TryFrom<Vec<RateEntry>> for RateTable {
    type Error = ConvertError;

    fn try_from(entries: Vec<RateEntry>) -> Result<Self, Self::Error> {
        let mut table = RateTable::new();
        for entry in entries {
            table.insert(RateKey::new(entry.from, entry.to), entry.rate)?;
        }
        Ok(table)
    }
}

impl From<RateTable> for Vec<RateEntry> {
    fn from(table: RateTable) -> Self {
        table
            .rates
            .into_iter()
            .map(|(key, rate)| RateEntry {
                from: key.from,
                to: key.to,
                rate,
            })
            .collect()
    }
}

/// A rate table together with the time it was fetched. Never mutated once
/// built; a refresh replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub base: CurrencyCode,
    pub table: RateTable,
    pub fetched_at: DateTime<Utc>,
}

impl RateSnapshot {
    pub fn new(base: CurrencyCode, table: RateTable, fetched_at: DateTime<Utc>) -> Self {
        Self {
            base,
            table,
            fetched_at,
        }
    }

    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.fetched_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    #[test]
    fn test_currency_code_normalizes_case() {
        assert_eq!(code("usd").as_str(), "USD");
        assert_eq!(code(" eur ").as_str(), "EUR");
    }

    #[test]
    fn test_currency_code_rejects_invalid() {
        for bad in ["", "US", "USDT", "U$D", "12A"] {
            assert!(
                matches!(CurrencyCode::new(bad), Err(ConvertError::InvalidCurrency(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rate_key_is_ordered() {
        let mut table = RateTable::new();
        table
            .insert(RateKey::new(code("USD"), code("EUR")), 0.85)
            .unwrap();
        assert!(table.contains(&code("USD"), &code("EUR")));
        assert!(!table.contains(&code("EUR"), &code("USD")));
    }

    #[test]
    fn test_rate_key_parse() {
        let key = RateKey::parse("usd_gbp").unwrap();
        assert_eq!(key.from, code("USD"));
        assert_eq!(key.to, code("GBP"));
        assert_eq!(key.to_string(), "USD_GBP");
        assert!(RateKey::parse("USDGBP").is_err());
    }

    #[test]
    fn test_rate_table_rejects_non_positive() {
        let mut table = RateTable::new();
        let key = RateKey::new(code("USD"), code("EUR"));
        assert!(table.insert(key.clone(), 0.0).is_err());
        assert!(table.insert(key.clone(), -1.2).is_err());
        assert!(table.insert(key.clone(), f64::NAN).is_err());
        assert!(table.insert(key, f64::INFINITY).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn test_rate_table_deserialize_validates_entries() {
        let json = r#"[{"from": "USD", "to": "EUR", "rate": -0.5}]"#;
        assert!(serde_json::from_str::<RateTable>(json).is_err());

        let json = r#"[{"from": "usd", "to": "eur", "rate": 0.5}]"#;
        let table: RateTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.get(&code("USD"), &code("EUR")), Some(0.5));
    }
}
