use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use xrates::cli::setup::setup;
use xrates::core::log::init_logging;

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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Run the HTTP API
    Serve {
        /// Address to listen on, overrides `server.bind`
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Manage catalog currencies
    #[command(subcommand)]
    Currency(CurrencyCommands),
    /// Manage stored exchange rates
    #[command(subcommand)]
    Rate(RateCommands),
}

#[derive(Subcommand)]
enum CurrencyCommands {
    /// Add a currency to the catalog
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,
        /// Three letter code, e.g. USD
        #[arg(long)]
        code: String,
        #[arg(short, long)]
        symbol: Option<String>,
        /// Flag image to copy into the media directory
        #[arg(short, long)]
        flag: Option<PathBuf>,
    },
    /// List catalog currencies
    List,
    /// Remove a currency and its exchange rates
    Remove {
        #[arg(long)]
        code: String,
    },
}

#[derive(Subcommand)]
enum RateCommands {
    /// Record a conversion rate for a currency pair
    Add {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Units of `to` per unit of `from`
        #[arg(long)]
        rate: String,
        /// Start of validity, RFC 3339 or YYYY-MM-DD
        #[arg(long)]
        from_date: String,
        /// End of validity, RFC 3339 or YYYY-MM-DD
        #[arg(long)]
        to_date: String,
    },
    /// List stored rates
    List {
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
}

impl From<Commands> for xrates::AppCommand {
    fn from(cmd: Commands) -> xrates::AppCommand {
        match cmd {
            Commands::Serve { bind } => xrates::AppCommand::Serve { bind },
            Commands::Currency(CurrencyCommands::Add {
                name,
                code,
                symbol,
                flag,
            }) => xrates::AppCommand::AddCurrency {
                name,
                code,
                symbol,
                flag,
            },
            Commands::Currency(CurrencyCommands::List) => xrates::AppCommand::ListCurrencies,
            Commands::Currency(CurrencyCommands::Remove { code }) => {
                xrates::AppCommand::RemoveCurrency { code }
            }
            Commands::Rate(RateCommands::Add {
                from,
                to,
                rate,
                from_date,
                to_date,
            }) => xrates::AppCommand::AddRate {
                from,
                to,
                rate,
                from_date,
                to_date,
            },
            Commands::Rate(RateCommands::List { from, to }) => xrates::AppCommand::ListRates {
                pair: from.zip(to),
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => xrates::cli::setup::setup_at_path(path),
            None => setup(),
        },
        Some(cmd) => xrates::run_command(cmd.into(), cli.config_path.as_deref()).await,
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
