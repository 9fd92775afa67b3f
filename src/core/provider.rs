//! Exchange rate source abstraction

use crate::core::currency::{CurrencyCode, RateTable};
use crate::core::error::ConvertResult;
use async_trait::async_trait;

#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetches every rate published for `base`, keyed `{base}_{other}`.
    async fn fetch_rates(&self, base: &CurrencyCode) -> ConvertResult<RateTable>;
}
