use crate::core::catalog::{
    Catalog, CatalogError, Currency, ExchangeRate, NewCurrency, NewExchangeRate, sort_currencies,
    sort_exchange_rates,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Tables {
    currencies: BTreeMap<u64, Currency>,
    exchange_rates: BTreeMap<u64, ExchangeRate>,
    next_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory catalog, used by tests and when no data directory is available.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn list_currencies(&self) -> Result<Vec<Currency>, CatalogError> {
        let tables = self.inner.lock().await;
        let mut currencies: Vec<Currency> = tables.currencies.values().cloned().collect();
        sort_currencies(&mut currencies);
        Ok(currencies)
    }

    async fn find_currency(&self, short_name: &str) -> Result<Option<Currency>, CatalogError> {
        let tables = self.inner.lock().await;
        Ok(tables
            .currencies
            .values()
            .find(|c| c.short_name == short_name)
            .cloned())
    }

    async fn add_currency(&self, currency: NewCurrency) -> Result<Currency, CatalogError> {
        currency.validate()?;
        let mut tables = self.inner.lock().await;
        if tables
            .currencies
            .values()
            .any(|c| c.short_name == currency.short_name)
        {
            return Err(CatalogError::Invalid(format!(
                "currency {} already exists",
                currency.short_name
            )));
        }
        let id = tables.next_id();
        let currency = currency.into_currency(id);
        debug!("Catalog PUT currency {}", currency.short_name);
        tables.currencies.insert(id, currency.clone());
        Ok(currency)
    }

    async fn remove_currency(&self, short_name: &str) -> Result<(), CatalogError> {
        let mut tables = self.inner.lock().await;
        let id = tables
            .currencies
            .values()
            .find(|c| c.short_name == short_name)
            .map(|c| c.id)
            .ok_or_else(|| CatalogError::NotFound(format!("Currency {short_name}")))?;
        tables.currencies.remove(&id);
        tables
            .exchange_rates
            .retain(|_, rate| rate.source_currency != id && rate.target_currency != id);
        debug!("Catalog REMOVE currency {short_name}");
        Ok(())
    }

    async fn add_exchange_rate(
        &self,
        rate: NewExchangeRate,
    ) -> Result<ExchangeRate, CatalogError> {
        rate.validate()?;
        let mut tables = self.inner.lock().await;
        for id in [rate.source_currency, rate.target_currency] {
            if !tables.currencies.contains_key(&id) {
                return Err(CatalogError::NotFound(format!("Currency #{id}")));
            }
        }
        let id = tables.next_id();
        let rate = rate.into_exchange_rate(id);
        tables.exchange_rates.insert(id, rate.clone());
        Ok(rate)
    }

    async fn exchange_rates_since(
        &self,
        source: u64,
        target: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRate>, CatalogError> {
        let tables = self.inner.lock().await;
        let mut rates: Vec<ExchangeRate> = tables
            .exchange_rates
            .values()
            .filter(|r| r.source_currency == source && r.target_currency == target)
            .filter(|r| r.from_date >= since)
            .cloned()
            .collect();
        sort_exchange_rates(&mut rates);
        Ok(rates)
    }

    async fn list_exchange_rates(&self) -> Result<Vec<ExchangeRate>, CatalogError> {
        let tables = self.inner.lock().await;
        let mut rates: Vec<ExchangeRate> = tables.exchange_rates.values().cloned().collect();
        sort_exchange_rates(&mut rates);
        Ok(rates)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;

    pub(crate) fn currency(short_name: &str, name: &str) -> NewCurrency {
        NewCurrency {
            name: name.to_string(),
            short_name: short_name.to_string(),
            symbol: None,
            flag: None,
        }
    }

    pub(crate) fn rate(source: u64, target: u64, rate: i64, from: DateTime<Utc>) -> NewExchangeRate {
        NewExchangeRate {
            source_currency: source,
            target_currency: target,
            conversion_rate: Decimal::new(rate, 2),
            from_date: from,
            to_date: from + Duration::days(1),
        }
    }

    /// Exercises the contract every `Catalog` implementation must honour.
    pub(crate) async fn check_catalog_contract(catalog: &dyn Catalog) {
        let usd = catalog.add_currency(currency("USD", "US Dollar")).await.unwrap();
        let eur = catalog.add_currency(currency("EUR", "Euro")).await.unwrap();
        let rub = catalog
            .add_currency(currency("RUB", "Russian Ruble"))
            .await
            .unwrap();

        let codes: Vec<String> = catalog
            .list_currencies()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.short_name)
            .collect();
        assert_eq!(codes, vec!["EUR", "RUB", "USD"]);

        assert!(catalog.add_currency(currency("USD", "Again")).await.is_err());
        assert_eq!(
            catalog.find_currency("EUR").await.unwrap().map(|c| c.id),
            Some(eur.id)
        );
        assert!(catalog.find_currency("NOK").await.unwrap().is_none());
        assert!(matches!(
            catalog.get_currency("NOK").await,
            Err(CatalogError::NotFound(_))
        ));

        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        for (days, value) in [(3, 9150), (1, 9100), (2, 9120)] {
            catalog
                .add_exchange_rate(rate(usd.id, rub.id, value, base + Duration::days(days)))
                .await
                .unwrap();
        }
        catalog
            .add_exchange_rate(rate(eur.id, rub.id, 9900, base + Duration::days(10)))
            .await
            .unwrap();
        assert!(matches!(
            catalog
                .add_exchange_rate(rate(usd.id, 999, 100, base))
                .await,
            Err(CatalogError::NotFound(_))
        ));

        let since = catalog
            .exchange_rates_since(usd.id, rub.id, base + Duration::days(2))
            .await
            .unwrap();
        let values: Vec<String> = since
            .iter()
            .map(|r| r.conversion_rate.to_string())
            .collect();
        assert_eq!(values, vec!["91.200000", "91.500000"]);

        assert_eq!(
            catalog.last_update().await.unwrap(),
            Some(base + Duration::days(10))
        );

        catalog.remove_currency("EUR").await.unwrap();
        assert_eq!(catalog.list_exchange_rates().await.unwrap().len(), 3);
        assert_eq!(
            catalog.last_update().await.unwrap(),
            Some(base + Duration::days(3))
        );
        assert!(catalog.remove_currency("EUR").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_catalog_contract() {
        check_catalog_contract(&MemoryCatalog::new()).await;
    }

    #[tokio::test]
    async fn test_empty_catalog_has_no_last_update() {
        let catalog = MemoryCatalog::new();
        assert!(catalog.last_update().await.unwrap().is_none());
        assert!(catalog.list_currencies().await.unwrap().is_empty());
    }
}
