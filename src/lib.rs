pub mod cli;
pub mod converter;
pub mod core;
pub mod providers;
pub mod rates;
pub mod store;

use crate::converter::{Converter, ConverterOptions};
use crate::core::config::AppConfig;
use crate::core::{Clock, Settings, SystemClock};
use crate::providers::exchange_rate_api::ExchangeRateApiProvider;
use crate::rates::{RateStore, RateStoreOptions};
use crate::store::{DiskStorage, StoreHandle};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub base_currency: Option<String>,
    pub auto_update: Option<bool>,
    pub update_interval_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Convert {
        amount: String,
        from: Option<String>,
        to: Option<String>,
        swap: bool,
    },
    Rate {
        from: String,
        to: String,
    },
    Currencies,
    History {
        clear: bool,
    },
    Refresh {
        bases: Vec<String>,
    },
    Settings(SettingsUpdate),
}

/// Everything a command needs, wired once per process.
pub struct App {
    pub config: AppConfig,
    pub settings: Settings,
    pub store: StoreHandle,
    pub rates: Arc<RateStore>,
    pub converter: Converter,
}

impl App {
    pub async fn build(config: AppConfig) -> Result<Self> {
        let store = match config.default_data_path() {
            Ok(path) => match DiskStorage::open(&path) {
                Ok(disk) => StoreHandle::new(Arc::new(disk)),
                Err(e) => {
                    warn!(error = %e, "Cannot open rate store, continuing in memory only");
                    StoreHandle::in_memory()
                }
            },
            Err(e) => {
                warn!(error = %e, "No data directory, continuing in memory only");
                StoreHandle::in_memory()
            }
        };

        let defaults = Settings::from_config(&config).context("Invalid base_currency in config")?;
        let settings = Settings::load(&store, defaults).await;
        debug!(?settings, "Effective settings");

        let api = &config.providers.exchange_rate_api;
        let provider = ExchangeRateApiProvider::new(&api.base_url, Duration::from_secs(api.timeout_secs))
            .context("Failed to create exchange rate client")?
            .with_retries(api.retries)
            .with_api_key(api.api_key.clone());

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let rates = Arc::new(RateStore::new(
            Arc::new(provider),
            store.clone(),
            Arc::clone(&clock),
            RateStoreOptions {
                ttl: settings.ttl(),
                auto_update: settings.auto_update,
                default_rates_path: config.default_rates_path.as_ref().map(PathBuf::from),
            },
        ));

        let converter = Converter::open(
            Arc::clone(&rates),
            store.clone(),
            clock,
            ConverterOptions {
                pivot: config
                    .pivot_currency
                    .parse()
                    .context("Invalid pivot_currency in config")?,
                history_limit: config.history_limit,
            },
        )
        .await;

        Ok(Self {
            config,
            settings,
            store,
            rates,
            converter,
        })
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("fxconv starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::build(config).await?;

    match command {
        AppCommand::Convert {
            amount,
            from,
            to,
            swap,
        } => cli::convert::run(&app, &amount, from.as_deref(), to.as_deref(), swap).await,
        AppCommand::Rate { from, to } => cli::convert::rate(&app, &from, &to).await,
        AppCommand::Currencies => cli::rates::currencies(&app).await,
        AppCommand::History { clear } => cli::history::run(&app, clear).await,
        AppCommand::Refresh { bases } => cli::rates::refresh(&app, &bases).await,
        AppCommand::Settings(update) => cli::settings::run(&app, update).await,
    }
}
