use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retries() -> usize {
    2
}

impl Default for ExchangeRateApiConfig {
    fn default() -> Self {
        ExchangeRateApiConfig {
            base_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub exchange_rate_api: ExchangeRateApiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_base_currency")]
    pub pivot_currency: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
    pub default_rates_path: Option<String>,
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_history_limit() -> usize {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_currency: default_base_currency(),
            pivot_currency: default_base_currency(),
            history_limit: default_history_limit(),
            providers: ProvidersConfig::default(),
            data_path: None,
            default_rates_path: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or falls back to built-in
    /// defaults when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxconv", "fxconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "fxconv", "fxconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
base_currency: "EUR"
pivot_currency: "USD"
history_limit: 5
providers:
  exchange_rate_api:
    base_url: "http://example.com/rates"
    timeout_secs: 3
    api_key: "abc123"
data_path: "/tmp/fxconv"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.base_currency, "EUR");
        assert_eq!(config.pivot_currency, "USD");
        assert_eq!(config.history_limit, 5);
        assert_eq!(
            config.providers.exchange_rate_api.base_url,
            "http://example.com/rates"
        );
        assert_eq!(config.providers.exchange_rate_api.timeout_secs, 3);
        assert_eq!(config.providers.exchange_rate_api.retries, 2);
        assert_eq!(
            config.providers.exchange_rate_api.api_key.as_deref(),
            Some("abc123")
        );
        assert_eq!(config.data_path.as_deref(), Some("/tmp/fxconv"));
        assert!(config.default_rates_path.is_none());
    }

    #[test]
    fn test_config_defaults_for_empty_document() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.pivot_currency, "USD");
        assert_eq!(config.history_limit, 10);
        assert_eq!(
            config.providers.exchange_rate_api.base_url,
            "https://api.exchangerate-api.com/v4/latest"
        );
        assert_eq!(config.providers.exchange_rate_api.timeout_secs, 10);
        assert!(config.providers.exchange_rate_api.api_key.is_none());
    }

    #[test]
    fn test_load_from_path_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load_from_path(dir.path().join("nope.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
