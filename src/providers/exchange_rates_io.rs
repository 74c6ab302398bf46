use super::util::{get_json, http_client, redact};
use crate::core::currency::{
    ConversionRates, HistoricalRateProvider, HistoricalRates, ProviderError, ensure_positive_rates,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Dated snapshots from the exchangeratesapi.io historical endpoint.
///
/// The free plan fixes the base currency, so callers derive other bases with
/// cross rates.
pub struct ExchangeRatesIoProvider {
    base_url: String,
    access_key: String,
    base_currency: String,
    client: Client,
}

impl ExchangeRatesIoProvider {
    pub fn new(
        base_url: &str,
        access_key: &str,
        base_currency: &str,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(ExchangeRatesIoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
            base_currency: base_currency.to_string(),
            client: http_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct HistoricalResponse {
    success: bool,
    base: Option<String>,
    date: Option<NaiveDate>,
    rates: Option<ConversionRates>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<i64>,
    #[serde(rename = "type")]
    kind: Option<String>,
    info: Option<String>,
}

impl ApiError {
    fn describe(self) -> String {
        let text = self
            .info
            .or(self.kind)
            .unwrap_or_else(|| "unknown error".to_string());
        match self.code {
            Some(code) => format!("{code}: {text}"),
            None => text,
        }
    }
}

#[async_trait]
impl HistoricalRateProvider for ExchangeRatesIoProvider {
    fn base_currency(&self) -> &str {
        &self.base_currency
    }

    #[instrument(name = "HistoricalRatesFetch", skip(self), fields(date = %date))]
    async fn fetch_on(&self, date: NaiveDate) -> Result<HistoricalRates, ProviderError> {
        let url = format!(
            "{}/{}?access_key={}",
            self.base_url,
            date.format("%Y-%m-%d"),
            self.access_key
        );
        let label = redact(&url, &self.access_key);
        let data: HistoricalResponse = get_json(&self.client, &url, &label, |body| {
            serde_json::from_str::<HistoricalResponse>(body)
                .ok()
                .and_then(|r| r.error)
                .map(ApiError::describe)
        })
        .await?;

        if !data.success {
            return Err(ProviderError::Rejected(
                data.error
                    .map(ApiError::describe)
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let rates = data
            .rates
            .ok_or_else(|| ProviderError::Malformed(format!("no rates for {date}")))?;
        ensure_positive_rates(&rates)?;
        debug!("Received {} historical rates for {}", rates.len(), date);

        Ok(HistoricalRates {
            base_code: data.base.unwrap_or_else(|| self.base_currency.clone()),
            date: data.date.unwrap_or(date),
            rates,
        })
    }
}
