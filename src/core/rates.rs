//! Rate arithmetic: inversion, cross rates through an intermediate base and
//! amount conversion.

use crate::core::currency::ConversionRates;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum RateError {
    #[error("No rate available for {0}")]
    Missing(String),

    #[error("Rate for {0} is not a positive number")]
    NonPositive(String),
}

/// Finest rounding precision an `f64` rate can meaningfully carry.
pub const MAX_ROUND_PLACES: u32 = 15;

fn checked_rate(rates: &ConversionRates, code: &str) -> Result<f64, RateError> {
    let rate = *rates
        .get(code)
        .ok_or_else(|| RateError::Missing(code.to_string()))?;
    if !(rate.is_finite() && rate > 0.0) {
        return Err(RateError::NonPositive(code.to_string()));
    }
    Ok(rate)
}

/// Rounds half away from zero to `places` decimal places.
///
/// Values too large to scale are already coarser than `places` and come back
/// unchanged.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places.min(MAX_ROUND_PLACES) as i32);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Turns rates of X against base B into rates of B against X.
pub fn invert_rates(rates: &ConversionRates) -> Result<ConversionRates, RateError> {
    rates
        .keys()
        .map(|code| Ok((code.clone(), 1.0 / checked_rate(rates, code)?)))
        .collect()
}

/// Rate of `source` against `target` derived from rates both share an
/// intermediate base with. With `inverse` the reciprocal is returned.
pub fn cross_rate(
    source: &str,
    target: &str,
    intermediate: &ConversionRates,
    inverse: bool,
) -> Result<f64, RateError> {
    let source_rate = checked_rate(intermediate, source)?;
    let target_rate = checked_rate(intermediate, target)?;
    if inverse {
        Ok(target_rate / source_rate)
    } else {
        Ok(source_rate / target_rate)
    }
}

/// Cross rates of `base` against every code in `codes`.
///
/// Codes the intermediate mapping does not know are skipped; a missing or
/// invalid `base` rate fails the whole computation.
pub fn cross_rates<'a, I>(
    base: &str,
    codes: I,
    intermediate: &ConversionRates,
    inverse: bool,
) -> Result<ConversionRates, RateError>
where
    I: IntoIterator<Item = &'a str>,
{
    checked_rate(intermediate, base)?;
    let mut result = ConversionRates::new();
    for code in codes {
        match cross_rate(base, code, intermediate, inverse) {
            Ok(rate) => {
                result.insert(code.to_string(), rate);
            }
            Err(e) => warn!(currency = %code, error = %e, "Skipping cross rate"),
        }
    }
    Ok(result)
}

pub fn convert(amount: f64, rate: f64, places: u32) -> f64 {
    round_to(amount * rate, places)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rates() -> ConversionRates {
        [
            ("EUR", 1.0),
            ("USD", 1.0825),
            ("RUB", 99.4312),
            ("NOK", 11.6543),
            ("JPY", 161.23),
            ("KZT", 485.117),
        ]
        .into_iter()
        .map(|(code, rate)| (code.to_string(), rate))
        .collect()
    }

    #[test]
    fn test_invert_twice_restores_rates() {
        let rates = sample_rates();
        let restored = invert_rates(&invert_rates(&rates).unwrap()).unwrap();
        assert_eq!(restored.len(), rates.len());
        for (code, rate) in &rates {
            assert!((restored[code] - rate).abs() < 1e-9, "{code} drifted");
        }
    }

    #[test]
    fn test_invert_rejects_zero_rate() {
        let mut rates = sample_rates();
        rates.insert("TMT".to_string(), 0.0);
        assert_eq!(
            invert_rates(&rates),
            Err(RateError::NonPositive("TMT".to_string()))
        );
    }

    #[test]
    fn test_cross_rate_round_trip_is_one() {
        let rates = sample_rates();
        let codes: Vec<&str> = rates.keys().map(String::as_str).collect();
        for a in &codes {
            for b in &codes {
                let there = cross_rate(a, b, &rates, false).unwrap();
                let back = cross_rate(b, a, &rates, false).unwrap();
                assert!((there * back - 1.0).abs() < 1e-12, "{a}/{b}");
            }
        }
    }

    #[test]
    fn test_cross_rate_inverse_flag() {
        let rates = sample_rates();
        let direct = cross_rate("RUB", "USD", &rates, false).unwrap();
        let inverse = cross_rate("RUB", "USD", &rates, true).unwrap();
        assert!((direct - 99.4312 / 1.0825).abs() < 1e-12);
        assert!((direct * inverse - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cross_rate_errors() {
        let mut rates = sample_rates();
        assert_eq!(
            cross_rate("RUB", "XAU", &rates, false),
            Err(RateError::Missing("XAU".to_string()))
        );
        rates.insert("USD".to_string(), 0.0);
        assert_eq!(
            cross_rate("RUB", "USD", &rates, false),
            Err(RateError::NonPositive("USD".to_string()))
        );
    }

    #[test]
    fn test_cross_rates_skips_unknown_codes() {
        let rates = sample_rates();
        let result = cross_rates("RUB", ["USD", "NOK", "XAU"], &rates, false).unwrap();
        assert_eq!(result.len(), 2);
        assert!((result["NOK"] - 99.4312 / 11.6543).abs() < 1e-12);
        assert!(!result.contains_key("XAU"));

        assert_eq!(
            cross_rates("XAU", ["USD"], &rates, false),
            Err(RateError::Missing("XAU".to_string()))
        );
    }

    #[test]
    fn test_convert_rounds_to_places() {
        assert_eq!(convert(100.0, 0.5, 6), 50.0);
        assert_eq!(convert(1.0, 1.0 / 3.0, 6), 0.333333);
        assert_eq!(convert(2.0, 0.0000015, 6), 0.000003);
        assert_eq!(convert(-10.0, 0.25, 6), -2.5);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456789, 6), 1.234568);
        assert_eq!(round_to(1.5, 0), 2.0);
        assert_eq!(round_to(-0.0000004, 6), 0.0);
    }

    #[test]
    fn test_round_to_large_values() {
        assert_eq!(round_to(1e303, 6), 1e303);
        assert_eq!(round_to(f64::MAX, 6), f64::MAX);
        assert_eq!(round_to(0.1234567, u32::MAX), round_to(0.1234567, MAX_ROUND_PLACES));

        let converted = convert(1e300, 89.75, 6);
        assert!(converted.is_finite());
        assert!((converted / 8.975e301 - 1.0).abs() < 1e-12);
        assert!(convert(1e307, 89.75, 6).is_infinite());
    }
}
