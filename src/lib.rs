pub mod api;
pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::api::AppState;
use crate::core::catalog::Catalog;
use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Serve {
        bind: Option<String>,
    },
    AddCurrency {
        name: String,
        code: String,
        symbol: Option<String>,
        flag: Option<PathBuf>,
    },
    ListCurrencies,
    RemoveCurrency {
        code: String,
    },
    AddRate {
        from: String,
        to: String,
        rate: String,
        from_date: String,
        to_date: String,
    },
    ListRates {
        pair: Option<(String, String)>,
    },
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    if let AppCommand::Serve { bind } = command {
        return serve(config, bind).await;
    }

    let catalog = store::open_catalog(&config)?;
    let catalog = catalog.as_ref();
    match command {
        AppCommand::Serve { .. } => unreachable!("serve is handled above"),
        AppCommand::AddCurrency {
            name,
            code,
            symbol,
            flag,
        } => {
            let media_dir = config.media_path()?;
            cli::catalog::add_currency(
                catalog,
                &media_dir,
                cli::catalog::CurrencyArgs {
                    name: &name,
                    code: &code,
                    symbol: symbol.as_deref(),
                    flag: flag.as_deref(),
                },
            )
            .await?;
            Ok(())
        }
        AppCommand::ListCurrencies => cli::catalog::list_currencies(catalog).await,
        AppCommand::RemoveCurrency { code } => cli::catalog::remove_currency(catalog, &code).await,
        AppCommand::AddRate {
            from,
            to,
            rate,
            from_date,
            to_date,
        } => {
            cli::catalog::add_rate(
                catalog,
                cli::catalog::RateArgs {
                    from: &from,
                    to: &to,
                    rate: &rate,
                    from_date: &from_date,
                    to_date: &to_date,
                },
            )
            .await?;
            Ok(())
        }
        AppCommand::ListRates { pair } => {
            let pair = pair.as_ref().map(|(f, t)| (f.as_str(), t.as_str()));
            cli::catalog::list_rates(catalog, pair).await
        }
    }
}

/// Wires the configured providers and catalog into the request state.
pub fn build_state(config: AppConfig, catalog: Arc<dyn Catalog>) -> Result<AppState> {
    let (latest, history) = providers::from_config(&config)?;
    Ok(AppState {
        config: Arc::new(config),
        catalog,
        latest: Arc::new(latest),
        history: Arc::new(history),
    })
}

/// Runs the HTTP service until Ctrl-C.
pub async fn serve(config: AppConfig, bind: Option<String>) -> Result<()> {
    info!("xrates starting...");
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let media_dir = config.media_path()?;
    let catalog = store::open_catalog(&config)?;
    let state = build_state(config, catalog)?;
    let app = api::router(state, Some(media_dir));

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
