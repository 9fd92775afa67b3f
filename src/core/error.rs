//! Conversion error types.

use crate::core::currency::CurrencyCode;
use thiserror::Error;

/// Errors raised by rate lookup, refresh and persistence.
///
/// None of these are fatal. Callers surface the message and keep working
/// with whatever rate data is already at hand.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// Amount was not a number, not finite, or not positive.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code is not three ASCII letters.
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// No direct or pivot path exists in the rate table.
    #[error("Rate not available for {from} to {to}")]
    RateUnavailable { from: CurrencyCode, to: CurrencyCode },

    /// Fetch failed, timed out, or returned a non-success status.
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    /// Response body did not match the expected shape.
    #[error("Parse failure: {0}")]
    ParseFailure(String),

    /// Durable storage could not be read or written.
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

pub type ConvertResult<T> = Result<T, ConvertError>;
