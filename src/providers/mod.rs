pub mod exchange_rate_api;
pub mod exchange_rates_io;
pub mod util;

use crate::core::config::AppConfig;
use anyhow::{Context, Result};
use exchange_rate_api::ExchangeRateApiProvider;
use exchange_rates_io::ExchangeRatesIoProvider;
use tracing::warn;

/// Builds both rate providers from the configuration.
pub fn from_config(
    config: &AppConfig,
) -> Result<(ExchangeRateApiProvider, ExchangeRatesIoProvider)> {
    let providers = &config.providers;
    let api_key = providers.exchange_rate.api_key.as_deref().unwrap_or_else(|| {
        warn!("No ExchangeRate-API key configured, live rate requests will be rejected");
        ""
    });
    let access_key = providers.history.access_key.as_deref().unwrap_or_else(|| {
        warn!("No exchangeratesapi.io access key configured, history requests will be rejected");
        ""
    });

    let latest = ExchangeRateApiProvider::new(
        &providers.exchange_rate.base_url,
        api_key,
        config.request_timeout(),
    )
    .context("Failed to build live rate client")?;
    let history = ExchangeRatesIoProvider::new(
        &providers.history.base_url,
        access_key,
        &providers.history.base_currency,
        config.request_timeout(),
    )
    .context("Failed to build historical rate client")?;
    Ok((latest, history))
}
