//! Currency rate provider abstractions

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use thiserror::Error;

/// Rates of each currency code relative to a single base currency.
pub type ConversionRates = HashMap<String, f64>;

/// Why a rate provider could not produce usable rates.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Rate provider unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    #[error("Rate provider returned HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Rate provider rejected the request: {0}")]
    Rejected(String),

    #[error("Malformed rate provider response: {0}")]
    Malformed(String),
}

/// Current rates as reported by the live provider.
#[derive(Debug, Clone)]
pub struct LatestRates {
    pub base_code: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub rates: ConversionRates,
}

/// A dated snapshot from the historical provider.
#[derive(Debug, Clone)]
pub struct HistoricalRates {
    pub base_code: String,
    pub date: NaiveDate,
    pub rates: ConversionRates,
}

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn fetch_latest(&self, base: &str) -> Result<LatestRates, ProviderError>;

    async fn latest_rates(&self, base: &str) -> Result<ConversionRates, ProviderError> {
        Ok(self.fetch_latest(base).await?.rates)
    }
}

#[async_trait]
pub trait HistoricalRateProvider: Send + Sync {
    /// Base currency every snapshot is expressed in.
    fn base_currency(&self) -> &str;

    async fn fetch_on(&self, date: NaiveDate) -> Result<HistoricalRates, ProviderError>;
}

/// Rejects payloads carrying rates that are zero, negative or not finite.
pub fn ensure_positive_rates(rates: &ConversionRates) -> Result<(), ProviderError> {
    if let Some((code, rate)) = rates
        .iter()
        .find(|(_, rate)| !(rate.is_finite() && **rate > 0.0))
    {
        return Err(ProviderError::Malformed(format!(
            "rate for {code} is not a positive number: {rate}"
        )));
    }
    Ok(())
}
