use crate::core::catalog::{
    Catalog, CatalogError, Currency, ExchangeRate, NewCurrency, NewExchangeRate, sort_currencies,
    sort_exchange_rates,
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

const CURRENCIES_PARTITION: &str = "currencies";
const EXCHANGE_RATES_PARTITION: &str = "exchange_rates";

fn storage<E: Into<anyhow::Error>>(err: E) -> CatalogError {
    CatalogError::Storage(err.into())
}

/// Catalog persisted in a fjall keyspace. Records are JSON encoded and keyed by
/// their big-endian id, so partitions iterate in insertion order.
pub struct FjallCatalog {
    keyspace: Keyspace,
    currencies: PartitionHandle,
    exchange_rates: PartitionHandle,
    /// Last issued id; also serialises writers.
    last_id: Mutex<u64>,
}

impl FjallCatalog {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create catalog directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open catalog at {}", path.display()))?;
        let currencies =
            keyspace.open_partition(CURRENCIES_PARTITION, PartitionCreateOptions::default())?;
        let exchange_rates =
            keyspace.open_partition(EXCHANGE_RATES_PARTITION, PartitionCreateOptions::default())?;

        let mut last_id = 0;
        for partition in [&currencies, &exchange_rates] {
            if let Some(entry) = partition.iter().next_back() {
                let (key, _) = entry?;
                last_id = last_id.max(decode_id(&key)?);
            }
        }
        debug!("Opened catalog at {} (last id {last_id})", path.display());

        Ok(Self {
            keyspace,
            currencies,
            exchange_rates,
            last_id: Mutex::new(last_id),
        })
    }

    fn scan<T: DeserializeOwned>(partition: &PartitionHandle) -> Result<Vec<T>, CatalogError> {
        partition
            .iter()
            .map(|entry| {
                let (_, value) = entry.map_err(storage)?;
                serde_json::from_slice(&value).map_err(storage)
            })
            .collect()
    }

    fn put<T: Serialize>(
        &self,
        partition: &PartitionHandle,
        id: u64,
        record: &T,
    ) -> Result<(), CatalogError> {
        let value = serde_json::to_vec(record).map_err(storage)?;
        partition
            .insert(id.to_be_bytes().to_vec(), value)
            .map_err(storage)?;
        self.keyspace.persist(PersistMode::SyncAll).map_err(storage)
    }
}

fn decode_id(key: &[u8]) -> anyhow::Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .with_context(|| format!("Corrupt catalog key of {} bytes", key.len()))?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl Catalog for FjallCatalog {
    async fn list_currencies(&self) -> Result<Vec<Currency>, CatalogError> {
        let mut currencies: Vec<Currency> = Self::scan(&self.currencies)?;
        sort_currencies(&mut currencies);
        Ok(currencies)
    }

    async fn find_currency(&self, short_name: &str) -> Result<Option<Currency>, CatalogError> {
        Ok(Self::scan::<Currency>(&self.currencies)?
            .into_iter()
            .find(|c| c.short_name == short_name))
    }

    async fn add_currency(&self, currency: NewCurrency) -> Result<Currency, CatalogError> {
        currency.validate()?;
        let mut last_id = self.last_id.lock().await;
        if self.find_currency(&currency.short_name).await?.is_some() {
            return Err(CatalogError::Invalid(format!(
                "currency {} already exists",
                currency.short_name
            )));
        }
        let currency = currency.into_currency(*last_id + 1);
        self.put(&self.currencies, currency.id, &currency)?;
        *last_id = currency.id;
        debug!("Catalog PUT currency {}", currency.short_name);
        Ok(currency)
    }

    async fn remove_currency(&self, short_name: &str) -> Result<(), CatalogError> {
        let _guard = self.last_id.lock().await;
        let currency = self.get_currency(short_name).await?;

        let mut batch = self.keyspace.batch();
        for rate in Self::scan::<ExchangeRate>(&self.exchange_rates)? {
            if rate.source_currency == currency.id || rate.target_currency == currency.id {
                batch.remove(&self.exchange_rates, rate.id.to_be_bytes().to_vec());
            }
        }
        batch.remove(&self.currencies, currency.id.to_be_bytes().to_vec());
        batch.commit().map_err(storage)?;
        self.keyspace.persist(PersistMode::SyncAll).map_err(storage)?;
        debug!("Catalog REMOVE currency {short_name}");
        Ok(())
    }

    async fn add_exchange_rate(
        &self,
        rate: NewExchangeRate,
    ) -> Result<ExchangeRate, CatalogError> {
        rate.validate()?;
        let mut last_id = self.last_id.lock().await;
        for id in [rate.source_currency, rate.target_currency] {
            if self
                .currencies
                .get(id.to_be_bytes())
                .map_err(storage)?
                .is_none()
            {
                return Err(CatalogError::NotFound(format!("Currency #{id}")));
            }
        }
        let rate = rate.into_exchange_rate(*last_id + 1);
        self.put(&self.exchange_rates, rate.id, &rate)?;
        *last_id = rate.id;
        Ok(rate)
    }

    async fn exchange_rates_since(
        &self,
        source: u64,
        target: u64,
        since: DateTime<Utc>,
    ) -> Result<Vec<ExchangeRate>, CatalogError> {
        let mut rates: Vec<ExchangeRate> = Self::scan::<ExchangeRate>(&self.exchange_rates)?
            .into_iter()
            .filter(|r| r.source_currency == source && r.target_currency == target)
            .filter(|r| r.from_date >= since)
            .collect();
        sort_exchange_rates(&mut rates);
        Ok(rates)
    }

    async fn list_exchange_rates(&self) -> Result<Vec<ExchangeRate>, CatalogError> {
        let mut rates: Vec<ExchangeRate> = Self::scan(&self.exchange_rates)?;
        sort_exchange_rates(&mut rates);
        Ok(rates)
    }
}
