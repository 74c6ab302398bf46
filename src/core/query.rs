//! Decoding of the `currencies` and `amount` query parameters.

use thiserror::Error;

pub const CURRENCY_MISSING_PARAM_ERROR_MESSAGE: &str =
    "Отсутствует один или несколько обязательных параметров!";
pub const AMOUNT_PARAM_ERROR_MESSAGE: &str = "Поле \"amount\" получило неожиданное значение";
pub const CURRENCIES_LENGTH_ERROR_MESSAGE: &str =
    "Параметр \"currencies\" должен состоять из трёхбуквенных кодов валют";

const CODE_LEN: usize = 3;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{}", CURRENCY_MISSING_PARAM_ERROR_MESSAGE)]
    UnsupportedCurrency(String),

    #[error("{}", CURRENCIES_LENGTH_ERROR_MESSAGE)]
    MalformedCurrencies(String),

    #[error("{}", AMOUNT_PARAM_ERROR_MESSAGE)]
    InvalidAmount(String),
}

/// A source currency followed by the targets it should be converted into, in
/// the order they were requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyQuery {
    pub source: String,
    pub targets: Vec<String>,
}

impl CurrencyQuery {
    /// Splits a string like `USDRUBEUR` into `USD` and `[RUB, EUR]`.
    ///
    /// The input must be ASCII and its length a multiple of three, at least six
    /// characters long. Every code must satisfy `is_supported`.
    pub fn decode(
        param: Option<&str>,
        is_supported: impl Fn(&str) -> bool,
    ) -> Result<Self, ValidationError> {
        let param = match param {
            Some(p) if !p.is_empty() => p,
            _ => return Err(ValidationError::UnsupportedCurrency(String::new())),
        };
        if !param.is_ascii() || param.len() % CODE_LEN != 0 || param.len() < 2 * CODE_LEN {
            return Err(ValidationError::MalformedCurrencies(param.to_string()));
        }

        let mut codes = param.as_bytes().chunks(CODE_LEN).map(|chunk| {
            // ASCII checked above, every chunk is valid UTF-8
            let code = String::from_utf8_lossy(chunk).into_owned();
            if is_supported(&code) {
                Ok(code)
            } else {
                Err(ValidationError::UnsupportedCurrency(code))
            }
        });

        let source = codes
            .next()
            .ok_or_else(|| ValidationError::MalformedCurrencies(param.to_string()))??;
        let targets = codes.collect::<Result<Vec<_>, _>>()?;
        Ok(CurrencyQuery { source, targets })
    }
}

/// Parses the `amount` parameter as a finite float.
pub fn parse_amount(param: Option<&str>) -> Result<f64, ValidationError> {
    let raw = param.unwrap_or_default();
    match raw.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(ValidationError::InvalidAmount(raw.to_string())),
    }
}
