use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::util::with_retry;
use crate::core::currency::{CurrencyCode, RateKey, RateTable};
use crate::core::error::{ConvertError, ConvertResult};
use crate::core::provider::RateProvider;

const RETRY_DELAY_MS: u64 = 500;

/// Client for `GET {base_url}/{BASE}` endpoints in the exchangerate-api.com
/// shape, i.e. a JSON body with a `rates` object.
pub struct ExchangeRateApiProvider {
    base_url: String,
    client: reqwest::Client,
    retries: usize,
    api_key: Option<String>,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> ConvertResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent("fxconv/0.1")
            .timeout(timeout)
            .build()
            .map_err(|e| ConvertError::NetworkFailure(format!("cannot build client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retries: 0,
            api_key: None,
        })
    }

    /// Retries transport errors up to `retries` times. HTTP error statuses are
    /// never retried.
    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Sends `api_key` as a query parameter on every request.
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.is_empty());
        self
    }

    fn rates_url(&self, base: &CurrencyCode) -> ConvertResult<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!("{}/{}", self.base_url, base))
            .map_err(|e| ConvertError::NetworkFailure(format!("Invalid URL for {base}: {e}")))?;
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("api_key", key);
        }
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

fn table_from_response(base: &CurrencyCode, response: LatestRatesResponse) -> ConvertResult<RateTable> {
    let mut table = RateTable::new();
    for (code, rate) in response.rates {
        let to = match CurrencyCode::new(&code) {
            Ok(to) => to,
            Err(e) => {
                warn!(error = %e, "Skipping unknown currency in response");
                continue;
            }
        };
        if let Err(e) = table.insert(RateKey::new(base.clone(), to), rate) {
            warn!(error = %e, "Skipping invalid rate in response");
        }
    }

    if table.is_empty() {
        return Err(ConvertError::ParseFailure(format!(
            "No usable rates in response for {base}"
        )));
    }
    Ok(table)
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &CurrencyCode) -> ConvertResult<RateTable> {
        let url = self.rates_url(base)?;
        debug!(
            authenticated = self.api_key.is_some(),
            "Requesting exchange rates from {}",
            url.path()
        );

        let response = with_retry(
            || self.client.get(url.clone()).send(),
            self.retries,
            RETRY_DELAY_MS,
        )
        .await
        .map_err(|e| ConvertError::NetworkFailure(format!("Request error: {e} for base: {base}")))?;

        if !response.status().is_success() {
            return Err(ConvertError::NetworkFailure(format!(
                "HTTP error: {} for base: {}",
                response.status(),
                base
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ConvertError::NetworkFailure(format!("Failed to read body: {e}")))?;

        let data: LatestRatesResponse = serde_json::from_str(&text).map_err(|e| {
            ConvertError::ParseFailure(format!("Failed to parse JSON response for {base}: {e}"))
        })?;

        let table = table_from_response(base, data)?;
        debug!(count = table.len(), "Parsed exchange rates");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::new(s).unwrap()
    }

    async fn create_mock_server(base: &str, template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{base}")))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &MockServer) -> ExchangeRateApiProvider {
        ExchangeRateApiProvider::new(&server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_response = r#"{
            "base": "USD",
            "date": "2024-05-01",
            "time_last_updated": 1714521601,
            "rates": {"USD": 1, "EUR": 0.85, "GBP": 0.73, "JPY": 110.5}
        }"#;
        let server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;

        let table = provider(&server).fetch_rates(&code("USD")).await.unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.get(&code("USD"), &code("EUR")), Some(0.85));
        assert_eq!(table.get(&code("USD"), &code("JPY")), Some(110.5));
        assert_eq!(table.get(&code("USD"), &code("USD")), Some(1.0));
        // Only the requested base is published
        assert!(table.get(&code("EUR"), &code("USD")).is_none());
    }

    #[tokio::test]
    async fn test_invalid_entries_are_skipped() {
        let mock_response = r#"{"rates": {"EUR": 0.85, "XX": 2.0, "GBP": 0, "JPY": -3}}"#;
        let server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;

        let table = provider(&server).fetch_rates(&code("USD")).await.unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(&code("USD"), &code("EUR")), Some(0.85));
    }

    #[tokio::test]
    async fn test_no_usable_rates_is_parse_failure() {
        let server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_body_string(r#"{"rates": {}}"#),
        )
        .await;

        let err = provider(&server).fetch_rates(&code("USD")).await.unwrap_err();
        assert_eq!(
            err,
            ConvertError::ParseFailure("No usable rates in response for USD".to_string())
        );
    }

    #[tokio::test]
    async fn test_api_error_response() {
        let server = create_mock_server("USD", ResponseTemplate::new(500)).await;

        let err = provider(&server).fetch_rates(&code("USD")).await.unwrap_err();
        assert_eq!(
            err,
            ConvertError::NetworkFailure(
                "HTTP error: 500 Internal Server Error for base: USD".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_response = r#"{"conversion_rates": {"EUR": 0.85}}"#; // no "rates" field
        let server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;

        let err = provider(&server).fetch_rates(&code("USD")).await.unwrap_err();
        match err {
            ConvertError::ParseFailure(msg) => {
                assert!(msg.contains("Failed to parse JSON response for USD"))
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_timeout_is_network_failure() {
        let server = create_mock_server(
            "USD",
            ResponseTemplate::new(200)
                .set_body_string(r#"{"rates": {"EUR": 0.85}}"#)
                .set_delay(Duration::from_millis(500)),
        )
        .await;

        let provider =
            ExchangeRateApiProvider::new(&server.uri(), Duration::from_millis(50)).unwrap();
        let err = provider.fetch_rates(&code("USD")).await.unwrap_err();
        assert!(matches!(err, ConvertError::NetworkFailure(_)));
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let server = create_mock_server(
            "EUR",
            ResponseTemplate::new(200).set_body_string(r#"{"rates": {"USD": 1.18}}"#),
        )
        .await;

        let provider =
            ExchangeRateApiProvider::new(&format!("{}/", server.uri()), Duration::from_secs(2))
                .unwrap();
        let table = provider.fetch_rates(&code("EUR")).await.unwrap();
        assert_eq!(table.get(&code("EUR"), &code("USD")), Some(1.18));
    }

    #[tokio::test]
    async fn test_api_key_is_sent_as_query_param() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/USD"))
            .and(query_param("api_key", "secret-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"rates": {"EUR": 0.85}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let table = provider(&server)
            .with_api_key(Some("secret-key".to_string()))
            .fetch_rates(&code("USD"))
            .await
            .unwrap();
        assert_eq!(table.get(&code("USD"), &code("EUR")), Some(0.85));
    }

    #[tokio::test]
    async fn test_empty_api_key_is_not_sent() {
        let provider = ExchangeRateApiProvider::new("http://localhost:1", Duration::from_secs(1))
            .unwrap()
            .with_api_key(Some(String::new()));
        let url = provider.rates_url(&code("GBP")).unwrap();
        assert_eq!(url.as_str(), "http://localhost:1/GBP");
    }
}
