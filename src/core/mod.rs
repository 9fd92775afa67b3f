//! Core types and abstractions

pub mod clock;
pub mod config;
pub mod currency;
pub mod error;
pub mod log;
pub mod provider;
pub mod settings;

// Re-export main types for cleaner imports
pub use clock::{Clock, SystemClock};
pub use currency::{CurrencyCode, RateKey, RateSnapshot, RateTable};
pub use error::{ConvertError, ConvertResult};
pub use provider::RateProvider;
pub use settings::Settings;
