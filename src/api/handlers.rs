use super::AppState;
use super::error::ApiError;
use crate::core::catalog::Currency;
use crate::core::period::TimePeriod;
use crate::core::query::{CurrencyQuery, ValidationError, parse_amount};
use crate::core::rates::{RateError, convert, cross_rates, invert_rates, round_to};
use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// URL prefix uploaded files are served under.
pub const MEDIA_URL: &str = "/media/";

#[derive(Debug, Serialize)]
pub struct CurrencyResponse {
    pub id: u64,
    pub name: String,
    pub short_name: String,
    pub symbol: Option<String>,
    pub flag: Option<String>,
    /// Price of one unit in the base currency.
    pub exchange_rate: f64,
    /// Change of `exchange_rate` over the past month.
    pub er_dynamics: f64,
}

#[derive(Debug, Deserialize)]
pub struct ConversionParams {
    pub currencies: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub currencies: Option<String>,
    pub time_period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub data: Vec<(Decimal, String)>,
    pub date: Option<DateTime<Utc>>,
}

impl CurrencyResponse {
    fn new(currency: Currency, exchange_rate: f64, month_ago: f64, places: u32) -> Self {
        CurrencyResponse {
            id: currency.id,
            name: currency.name,
            short_name: currency.short_name,
            symbol: currency.symbol,
            flag: currency.flag.map(|path| format!("{MEDIA_URL}{path}")),
            exchange_rate: round_to(exchange_rate, places),
            er_dynamics: round_to(exchange_rate - month_ago, places),
        }
    }
}

/// GET /currencies - catalog currencies priced in the base currency
#[instrument(skip_all)]
pub async fn currencies(
    State(state): State<AppState>,
) -> Result<Json<Vec<CurrencyResponse>>, ApiError> {
    let base = state.config.base_currency.as_str();
    let currencies = state.catalog.list_currencies().await?;
    let month_ago = (Utc::now() - Months::new(1)).date_naive();

    let (latest, snapshot) = futures::try_join!(
        async { state.latest.fetch_latest(base).await.map_err(ApiError::from) },
        async { state.history.fetch_on(month_ago).await.map_err(ApiError::from) },
    )?;
    debug!(
        updated_at = ?latest.updated_at,
        snapshot_date = %snapshot.date,
        "Fetched live and month-old rates"
    );
    if snapshot.base_code != state.history.base_currency() {
        warn!(
            expected = state.history.base_currency(),
            actual = %snapshot.base_code,
            "Historical snapshot came back in an unexpected base"
        );
    }

    // Live rates are quoted per unit of base, flip them to price each currency in base
    let current = invert_rates(&latest.rates)?;

    let mut intermediate = snapshot.rates;
    intermediate.entry(snapshot.base_code).or_insert(1.0);
    let previous = cross_rates(
        base,
        currencies.iter().map(|c| c.short_name.as_str()),
        &intermediate,
        false,
    )?;

    let places = state.config.round_places;
    let response = currencies
        .into_iter()
        .map(|currency| {
            let now = current.get(&currency.short_name).copied().unwrap_or(0.0);
            let before = previous.get(&currency.short_name).copied().unwrap_or(0.0);
            CurrencyResponse::new(currency, now, before, places)
        })
        .collect();
    Ok(Json(response))
}

/// GET /conversion?currencies=USDRUBEUR&amount=10 - converted amounts in target order
#[instrument(skip_all)]
pub async fn conversion(
    State(state): State<AppState>,
    params: Result<Query<ConversionParams>, QueryRejection>,
) -> Result<Json<Vec<f64>>, ApiError> {
    let Query(params) = params?;
    let query = CurrencyQuery::decode(params.currencies.as_deref(), |code| {
        state.config.is_supported(code)
    })?;
    let amount = parse_amount(params.amount.as_deref())?;

    let rates = state.latest.latest_rates(&query.source).await?;
    let places = state.config.round_places;
    let results = query
        .targets
        .iter()
        .map(|target| {
            let rate = rates
                .get(target)
                .copied()
                .ok_or_else(|| RateError::Missing(target.clone()))?;
            let value = convert(amount, rate, places);
            if !value.is_finite() {
                return Err(ApiError::from(ValidationError::InvalidAmount(
                    amount.to_string(),
                )));
            }
            Ok(value)
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    debug!(source = %query.source, ?results, "Converted amount");
    Ok(Json(results))
}

/// GET /history?currencies=USDRUB&time_period=Месяц - stored rates for charting
#[instrument(skip_all)]
pub async fn history(
    State(state): State<AppState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(params) = params?;
    let query = CurrencyQuery::decode(params.currencies.as_deref(), |code| {
        state.config.is_supported(code)
    })?;
    let target_code = query
        .targets
        .first()
        .ok_or_else(|| ValidationError::MalformedCurrencies(query.source.clone()))?;

    let source = state.catalog.get_currency(&query.source).await?;
    let target = state.catalog.get_currency(target_code).await?;

    let period = TimePeriod::from_label(params.time_period.as_deref());
    let since = period.cutoff(Utc::now());
    debug!(%period, %since, "Looking up rate history");

    let data = state
        .catalog
        .exchange_rates_since(source.id, target.id, since)
        .await?
        .into_iter()
        .map(|rate| (rate.conversion_rate, target.short_name.clone()))
        .collect();
    let date = state.catalog.last_update().await?;

    Ok(Json(HistoryResponse { data, date }))
}
