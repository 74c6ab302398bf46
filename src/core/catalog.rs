//! Currency catalog and simulated rate history records.

use crate::core::config::is_currency_code;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CURRENCY_NAME_MAX_LENGTH: usize = 50;
pub const CURRENCY_SYMBOL_MAX_LENGTH: usize = 15;
pub const CONVERSION_RATE_DECIMAL_PLACES: u32 = 6;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub id: u64,
    pub name: String,
    pub short_name: String,
    /// HTML entity for the currency sign, e.g. `&#36;`.
    pub symbol: Option<String>,
    /// Flag image path relative to the media directory.
    pub flag: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCurrency {
    pub name: String,
    pub short_name: String,
    pub symbol: Option<String>,
    pub flag: Option<String>,
}

impl NewCurrency {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if !is_currency_code(&self.short_name) {
            return Err(CatalogError::Invalid(format!(
                "currency code must be three uppercase letters, got {:?}",
                self.short_name
            )));
        }
        if self.name.trim().is_empty() || self.name.chars().count() > CURRENCY_NAME_MAX_LENGTH {
            return Err(CatalogError::Invalid(format!(
                "currency name must be 1-{CURRENCY_NAME_MAX_LENGTH} characters"
            )));
        }
        if let Some(symbol) = &self.symbol {
            if symbol.chars().count() > CURRENCY_SYMBOL_MAX_LENGTH {
                return Err(CatalogError::Invalid(format!(
                    "currency symbol must be at most {CURRENCY_SYMBOL_MAX_LENGTH} characters"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn into_currency(self, id: u64) -> Currency {
        Currency {
            id,
            name: self.name,
            short_name: self.short_name,
            symbol: self.symbol,
            flag: self.flag,
        }
    }
}

/// A manually entered rate valid over `[from_date, to_date)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub id: u64,
    pub source_currency: u64,
    pub target_currency: u64,
    pub conversion_rate: Decimal,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExchangeRate {
    pub source_currency: u64,
    pub target_currency: u64,
    pub conversion_rate: Decimal,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
}

impl NewExchangeRate {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.conversion_rate <= Decimal::ZERO {
            return Err(CatalogError::Invalid(
                "conversion rate must be positive".to_string(),
            ));
        }
        if self.conversion_rate.normalize().scale() > CONVERSION_RATE_DECIMAL_PLACES {
            return Err(CatalogError::Invalid(format!(
                "conversion rate {} has more than {CONVERSION_RATE_DECIMAL_PLACES} decimal places",
                self.conversion_rate
            )));
        }
        if self.from_date >= self.to_date {
            return Err(CatalogError::Invalid(
                "from_date must be earlier than to_date".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_exchange_rate(self, id: u64) -> ExchangeRate {
        let mut conversion_rate = self.conversion_rate;
        conversion_rate.rescale(CONVERSION_RATE_DECIMAL_PLACES);
        ExchangeRate {
            id,
            source_currency: self.source_currency,
            target_currency: self.target_currency,
            conversion_rate,
            from_date: self.from_date,
            to_date: self.to_date,
        }
    }
}

/// Storage for currencies and their rate history.
///
/// Currencies come back ordered by `(short_name, name)`, exchange rates by
/// `from_date`. Removing a currency removes every rate referencing it.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn list_currencies(&self) -> Result<Vec<Currency>, CatalogError>;

    async fn find_currency(&self, short_name: &str) -> Result<Option<Currency>, CatalogError>;

    async fn add_currency(&self, currency: NewCurrency) -> Result<Currency, CatalogError>;

    async fn remove_currency(&self, short_name: &str) -> Result<(), CatalogError>;

    async fn add_exchange_rate(&self, rate: NewExchangeRate)
    -> Result<ExchangeRate, CatalogError>;

    /// Rates from `source` to `target` with `from_date >= since`.
    async fn exchange_rates_since(
        &self,
        source: u64,
        target: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRate>, CatalogError>;

    async fn list_exchange_rates(&self) -> Result<Vec<ExchangeRate>, CatalogError>;

    /// Most recent `from_date` across all rates.
    async fn last_update(&self) -> Result<Option<DateTime<Utc>>, CatalogError> {
        Ok(self
            .list_exchange_rates()
            .await?
            .into_iter()
            .map(|rate| rate.from_date)
            .max())
    }

    async fn get_currency(&self, short_name: &str) -> Result<Currency, CatalogError> {
        self.find_currency(short_name)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("Currency {short_name}")))
    }
}

pub(crate) fn sort_currencies(currencies: &mut [Currency]) {
    currencies.sort_by(|a, b| {
        a.short_name
            .cmp(&b.short_name)
            .then_with(|| a.name.cmp(&b.name))
    });
}

pub(crate) fn sort_exchange_rates(rates: &mut [ExchangeRate]) {
    rates.sort_by(|a, b| {
        a.from_date
            .cmp(&b.from_date)
            .then_with(|| a.source_currency.cmp(&b.source_currency))
    });
}
