use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::Path;

const EXAMPLE_CONFIG: &str = include_str!("../../docs/example_config.yaml");

/// `fxconv setup`: drops the commented example config where `AppConfig::load`
/// looks for it.
pub fn setup() -> Result<()> {
    let path = AppConfig::default_config_path()?;
    write_example_config(&path)?;
    println!("Created default configuration at {}", path.display());
    Ok(())
}

/// Never overwrites: an existing file at `path` is an error and stays as is.
pub fn write_example_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!(
            "{} already exists, edit it or remove it first",
            path.display()
        );
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create config directory {}", dir.display()))?;
    }
    std::fs::write(path, EXAMPLE_CONFIG)
        .with_context(|| format!("Cannot write {}", path.display()))?;

    tracing::info!(path = %path.display(), "Wrote example config");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_written_config_loads_as_defaults() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("fxconv").join("config.yaml");

        write_example_config(&path)?;
        let written = AppConfig::load_from_path(&path)?;
        let defaults = AppConfig::default();

        assert_eq!(written.base_currency, defaults.base_currency);
        assert_eq!(written.pivot_currency, defaults.pivot_currency);
        assert_eq!(written.history_limit, defaults.history_limit);
        assert_eq!(
            written.providers.exchange_rate_api.base_url,
            defaults.providers.exchange_rate_api.base_url
        );
        assert_eq!(written.providers.exchange_rate_api.retries, 2);
        assert!(written.providers.exchange_rate_api.api_key.is_none());
        assert!(written.data_path.is_none());
        assert!(written.default_rates_path.is_none());
        Ok(())
    }

    #[test]
    fn test_existing_config_is_kept() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "base_currency: GBP\n")?;

        let err = write_example_config(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(AppConfig::load_from_path(&path)?.base_currency, "GBP");
        Ok(())
    }
}
