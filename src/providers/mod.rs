pub mod exchange_rate_api;
pub mod util;
