//! Admin commands for maintaining the currency catalog and rate history.

use super::ui;
use crate::core::catalog::{Catalog, Currency, ExchangeRate, NewCurrency, NewExchangeRate};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use comfy_table::Cell;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Media-relative directory flag images are stored in.
pub const FLAG_UPLOAD_DIR: &str = "currencies/flags/images";

pub struct CurrencyArgs<'a> {
    pub name: &'a str,
    pub code: &'a str,
    pub symbol: Option<&'a str>,
    pub flag: Option<&'a Path>,
}

/// Copies a flag image into the media directory, returning its media-relative path.
pub fn store_flag(media_dir: &Path, code: &str, source: &Path) -> Result<String> {
    let extension = source
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("svg")
        .to_lowercase();
    let relative = format!("{FLAG_UPLOAD_DIR}/{}.{extension}", code.to_lowercase());
    let destination = media_dir.join(&relative);
    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    std::fs::copy(source, &destination).with_context(|| {
        format!(
            "Failed to copy flag {} to {}",
            source.display(),
            destination.display()
        )
    })?;
    Ok(relative)
}

pub async fn add_currency(
    catalog: &dyn Catalog,
    media_dir: &Path,
    args: CurrencyArgs<'_>,
) -> Result<Currency> {
    let short_name = args.code.to_uppercase();
    let flag = args
        .flag
        .map(|path| store_flag(media_dir, &short_name, path))
        .transpose()?;
    let currency = catalog
        .add_currency(NewCurrency {
            name: args.name.to_string(),
            short_name,
            symbol: args.symbol.map(str::to_string),
            flag,
        })
        .await?;
    info!("Added currency {} (#{})", currency.short_name, currency.id);
    Ok(currency)
}

pub async fn remove_currency(catalog: &dyn Catalog, code: &str) -> Result<()> {
    catalog.remove_currency(&code.to_uppercase()).await?;
    info!("Removed currency {code} and its exchange rates");
    Ok(())
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Failed to parse date: {value}"))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("Invalid date: {value}"))
}

pub struct RateArgs<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub rate: &'a str,
    pub from_date: &'a str,
    pub to_date: &'a str,
}

pub async fn add_rate(catalog: &dyn Catalog, args: RateArgs<'_>) -> Result<ExchangeRate> {
    let source = catalog.get_currency(&args.from.to_uppercase()).await?;
    let target = catalog.get_currency(&args.to.to_uppercase()).await?;
    let conversion_rate = Decimal::from_str(args.rate)
        .with_context(|| format!("Invalid conversion rate: {}", args.rate))?;

    let rate = catalog
        .add_exchange_rate(NewExchangeRate {
            source_currency: source.id,
            target_currency: target.id,
            conversion_rate,
            from_date: parse_datetime(args.from_date)?,
            to_date: parse_datetime(args.to_date)?,
        })
        .await?;
    info!(
        "Added {}/{} rate {} from {}",
        source.short_name, target.short_name, rate.conversion_rate, rate.from_date
    );
    Ok(rate)
}

pub fn currencies_table(currencies: &[Currency]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("Code"),
        ui::header_cell("Name"),
        ui::header_cell("Symbol"),
        ui::header_cell("Flag"),
    ]);
    for currency in currencies {
        table.add_row(vec![
            ui::number_cell(currency.id),
            Cell::new(&currency.short_name),
            Cell::new(&currency.name),
            ui::format_optional_cell(currency.symbol.as_deref(), str::to_string),
            ui::format_optional_cell(currency.flag.as_deref(), str::to_string),
        ]);
    }
    table.to_string()
}

pub fn rates_table(rates: &[ExchangeRate], currencies: &[Currency]) -> String {
    let codes: HashMap<u64, &str> = currencies
        .iter()
        .map(|c| (c.id, c.short_name.as_str()))
        .collect();
    let code = |id: u64| codes.get(&id).copied().unwrap_or("?").to_string();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ID"),
        ui::header_cell("From"),
        ui::header_cell("To"),
        ui::header_cell("Rate"),
        ui::header_cell("Valid from"),
        ui::header_cell("Valid to"),
    ]);
    for rate in rates {
        table.add_row(vec![
            ui::number_cell(rate.id),
            Cell::new(code(rate.source_currency)),
            Cell::new(code(rate.target_currency)),
            ui::number_cell(rate.conversion_rate),
            Cell::new(rate.from_date.to_rfc3339()),
            Cell::new(rate.to_date.to_rfc3339()),
        ]);
    }
    table.to_string()
}

pub async fn list_currencies(catalog: &dyn Catalog) -> Result<()> {
    let currencies = catalog.list_currencies().await?;
    println!("{}", ui::style_text("Currencies", ui::StyleType::Title));
    if currencies.is_empty() {
        println!(
            "{}",
            ui::style_text("No currencies configured yet.", ui::StyleType::Subtle)
        );
        return Ok(());
    }
    println!("{}", currencies_table(&currencies));
    Ok(())
}

/// Prints stored rates, optionally restricted to one currency pair.
pub async fn list_rates(catalog: &dyn Catalog, pair: Option<(&str, &str)>) -> Result<()> {
    let currencies = catalog.list_currencies().await?;
    let rates = match pair {
        Some((from, to)) => {
            let source = catalog.get_currency(&from.to_uppercase()).await?;
            let target = catalog.get_currency(&to.to_uppercase()).await?;
            catalog
                .exchange_rates_since(source.id, target.id, DateTime::<Utc>::MIN_UTC)
                .await?
        }
        None => catalog.list_exchange_rates().await?,
    };
    println!("{}", ui::style_text("Exchange rates", ui::StyleType::Title));
    println!("{}", rates_table(&rates, &currencies));
    println!(
        "{}",
        ui::style_text(&format!("{} rows", rates.len()), ui::StyleType::Success)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCatalog;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_parse_datetime() {
        assert_eq!(
            parse_datetime("2024-05-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_datetime("2024-05-01T12:30:00+03:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
        );
        assert!(parse_datetime("01.05.2024").is_err());
    }

    #[tokio::test]
    async fn test_add_currency_with_flag() -> Result<()> {
        let media = TempDir::new()?;
        let uploads = TempDir::new()?;
        let flag_path = uploads.path().join("Flag.SVG");
        std::fs::write(&flag_path, "<svg/>")?;

        let catalog = MemoryCatalog::new();
        let currency = add_currency(
            &catalog,
            media.path(),
            CurrencyArgs {
                name: "Norwegian Krone",
                code: "nok",
                symbol: Some("kr"),
                flag: Some(&flag_path),
            },
        )
        .await?;

        assert_eq!(currency.short_name, "NOK");
        assert_eq!(
            currency.flag.as_deref(),
            Some("currencies/flags/images/nok.svg")
        );
        let stored = media.path().join("currencies/flags/images/nok.svg");
        assert_eq!(std::fs::read_to_string(stored)?, "<svg/>");

        let table = currencies_table(&catalog.list_currencies().await?);
        assert!(table.contains("Norwegian Krone"));
        assert!(table.contains("kr"));
        Ok(())
    }

    #[tokio::test]
    async fn test_add_and_list_rates() -> Result<()> {
        let media = TempDir::new()?;
        let catalog = MemoryCatalog::new();
        for (code, name) in [("USD", "US Dollar"), ("RUB", "Russian Ruble")] {
            add_currency(
                &catalog,
                media.path(),
                CurrencyArgs {
                    name,
                    code,
                    symbol: None,
                    flag: None,
                },
            )
            .await?;
        }

        let rate = add_rate(
            &catalog,
            RateArgs {
                from: "usd",
                to: "RUB",
                rate: "91.25",
                from_date: "2024-05-01",
                to_date: "2024-05-02",
            },
        )
        .await?;
        assert_eq!(rate.conversion_rate.to_string(), "91.250000");

        let bad = add_rate(
            &catalog,
            RateArgs {
                from: "USD",
                to: "RUB",
                rate: "ninety",
                from_date: "2024-05-01",
                to_date: "2024-05-02",
            },
        )
        .await;
        assert!(bad.unwrap_err().to_string().contains("Invalid conversion rate"));

        let missing = add_rate(
            &catalog,
            RateArgs {
                from: "USD",
                to: "NOK",
                rate: "10",
                from_date: "2024-05-01",
                to_date: "2024-05-02",
            },
        )
        .await;
        assert!(missing.is_err());

        let table = rates_table(
            &catalog.list_exchange_rates().await?,
            &catalog.list_currencies().await?,
        );
        assert!(table.contains("91.250000"));
        assert!(table.contains("USD"));

        remove_currency(&catalog, "rub").await?;
        assert!(catalog.list_exchange_rates().await?.is_empty());
        Ok(())
    }
}
