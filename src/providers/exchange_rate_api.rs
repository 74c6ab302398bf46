use super::util::{get_json, http_client, redact};
use crate::core::currency::{
    ConversionRates, CurrencyRateProvider, LatestRates, ProviderError, ensure_positive_rates,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Live rates from the ExchangeRate-API v6 `latest` endpoint.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> reqwest::Result<Self> {
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    base_code: Option<String>,
    time_last_update_unix: Option<i64>,
    conversion_rates: Option<ConversionRates>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

#[async_trait]
impl CurrencyRateProvider for ExchangeRateApiProvider {
    #[instrument(name = "LatestRatesFetch", skip(self), fields(base = %base))]
    async fn fetch_latest(&self, base: &str) -> Result<LatestRates, ProviderError> {
        let url = format!("{}/{}/latest/{}", self.base_url, self.api_key, base);
        let label = redact(&url, &self.api_key);
        let data: LatestResponse = get_json(&self.client, &url, &label, |body| {
            serde_json::from_str::<LatestResponse>(body)
                .ok()
                .and_then(|r| r.error_type)
        })
        .await?;

        if data.result != "success" {
            return Err(ProviderError::Rejected(
                data.error_type.unwrap_or(data.result),
            ));
        }

        let rates = data.conversion_rates.ok_or_else(|| {
            ProviderError::Malformed(format!("no conversion_rates for base {base}"))
        })?;
        ensure_positive_rates(&rates)?;
        debug!("Received {} rates for base {}", rates.len(), base);

        Ok(LatestRates {
            base_code: data.base_code.unwrap_or_else(|| base.to_string()),
            updated_at: data
                .time_last_update_unix
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single()),
            rates,
        })
    }
}
