//! Core business logic abstractions

pub mod catalog;
pub mod config;
pub mod currency;
pub mod log;
pub mod period;
pub mod query;
pub mod rates;

// Re-export main types for cleaner imports
pub use catalog::{Catalog, CatalogError, Currency, ExchangeRate};
pub use currency::{CurrencyRateProvider, HistoricalRateProvider, ProviderError};
pub use period::TimePeriod;
