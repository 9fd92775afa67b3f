use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxconv::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for fxconv::AppCommand {
    fn from(cmd: Commands) -> fxconv::AppCommand {
        match cmd {
            Commands::Convert {
                amount,
                from,
                to,
                swap,
            } => fxconv::AppCommand::Convert {
                amount,
                from,
                to,
                swap,
            },
            Commands::Rate { from, to } => fxconv::AppCommand::Rate { from, to },
            Commands::Currencies => fxconv::AppCommand::Currencies,
            Commands::History { clear } => fxconv::AppCommand::History { clear },
            Commands::Refresh { bases } => fxconv::AppCommand::Refresh { bases },
            Commands::Settings {
                base,
                auto_update,
                interval,
            } => fxconv::AppCommand::Settings(fxconv::SettingsUpdate {
                base_currency: base,
                auto_update,
                update_interval_minutes: interval,
            }),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount between two currencies
    Convert {
        /// Amount to convert
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Source currency (defaults to the configured base currency)
        from: Option<String>,
        /// Target currency (defaults to EUR)
        to: Option<String>,
        /// Swap source and target before converting
        #[arg(short, long)]
        swap: bool,
    },
    /// Show the exchange rate between two currencies
    Rate { from: String, to: String },
    /// List supported currencies
    Currencies,
    /// Show recent conversions
    History {
        /// Delete all recorded conversions
        #[arg(long)]
        clear: bool,
    },
    /// Fetch fresh rates, ignoring the cache
    Refresh {
        /// Base currencies to refresh (defaults to the configured base currency)
        bases: Vec<String>,
    },
    /// Show or change saved settings
    Settings {
        /// Base currency
        #[arg(long)]
        base: Option<String>,
        /// Fetch new rates once the cached ones expire
        #[arg(long)]
        auto_update: Option<bool>,
        /// Minutes before cached rates expire
        #[arg(long)]
        interval: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxconv::cli::setup::setup(),
        Some(cmd) => fxconv::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
