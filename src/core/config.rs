use crate::core::rates::MAX_ROUND_PLACES;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::{debug, info};

pub const EXCHANGE_RATE_API_KEY_VAR: &str = "EXCHANGE_RATE_API_KEY";
pub const HISTORY_ACCESS_KEY_VAR: &str = "OPEN_EXCHANGE_RATE_API_KEY";

/// Currencies the API accepts in query parameters unless the config says otherwise.
pub const DEFAULT_SUPPORTED_CURRENCIES: [&str; 30] = [
    "USD", "EUR", "RUB", "CNY", "GBP", "BYN", "KZT", "KGS", "MDL", "TMT", "AMD", "AZN", "UZS",
    "CHF", "CZK", "ZAR", "BGN", "HUF", "AUD", "INR", "TRY", "THB", "DKK", "RON", "NOK", "JPY",
    "SGD", "AED", "SEK", "CAD",
];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ExchangeRateProviderConfig {
    fn default() -> Self {
        ExchangeRateProviderConfig {
            base_url: "https://v6.exchangerate-api.com/v6".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub access_key: Option<String>,
    /// Base currency of historical snapshots; fixed by the provider on the free tier.
    #[serde(default = "default_history_base")]
    pub base_currency: String,
}

impl Default for HistoryProviderConfig {
    fn default() -> Self {
        HistoryProviderConfig {
            base_url: "https://api.exchangeratesapi.io/v1".to_string(),
            access_key: None,
            base_currency: default_history_base(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub exchange_rate: ExchangeRateProviderConfig,
    #[serde(default)]
    pub history: HistoryProviderConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Currency every listed rate is expressed in.
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_supported_currencies")]
    pub supported_currencies: Vec<String>,
    #[serde(default = "default_round_places")]
    pub round_places: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub data_path: Option<String>,
}

fn default_base_currency() -> String {
    "RUB".to_string()
}

fn default_history_base() -> String {
    "EUR".to_string()
}

fn default_supported_currencies() -> Vec<String> {
    DEFAULT_SUPPORTED_CURRENCIES
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_round_places() -> u32 {
    6
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            base_currency: default_base_currency(),
            supported_currencies: default_supported_currencies(),
            round_places: default_round_places(),
            request_timeout_secs: default_request_timeout_secs(),
            providers: ProvidersConfig::default(),
            server: ServerConfig::default(),
            data_path: None,
        }
    }
}

/// Returns true for a three letter uppercase ASCII code such as `USD`.
pub fn is_currency_code(code: &str) -> bool {
    code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase())
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults when
    /// no file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            info!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            let mut config = Self::default();
            config.apply_env();
            config.validate()?;
            return Ok(config);
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "xrates", "xrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "xrates", "xrates")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Directory uploaded flag images are copied into and served from.
    pub fn media_path(&self) -> Result<PathBuf> {
        Ok(self.default_data_path()?.join("media"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.apply_env();
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Provider keys may come from the environment (or a `.env` file) instead of
    /// the config file. Environment values win.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var(EXCHANGE_RATE_API_KEY_VAR) {
            self.providers.exchange_rate.api_key = Some(key);
        }
        if let Ok(key) = std::env::var(HISTORY_ACCESS_KEY_VAR) {
            self.providers.history.access_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self
            .supported_currencies
            .iter()
            .find(|code| !is_currency_code(code))
        {
            bail!("Invalid currency code in supported_currencies: {bad:?}");
        }
        if !self.is_supported(&self.base_currency) {
            bail!(
                "Base currency {} is not in supported_currencies",
                self.base_currency
            );
        }
        if !is_currency_code(&self.providers.history.base_currency) {
            bail!(
                "Invalid history base currency: {:?}",
                self.providers.history.base_currency
            );
        }
        if self.round_places > MAX_ROUND_PLACES {
            bail!(
                "round_places must be at most {MAX_ROUND_PLACES}, got {}",
                self.round_places
            );
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.supported_currencies.iter().any(|c| c == code)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
base_currency: "USD"
supported_currencies: ["USD", "EUR", "RUB"]
round_places: 4
request_timeout_secs: 3
providers:
  exchange_rate:
    base_url: "http://example.com/v6"
    api_key: "abc"
  history:
    base_url: "http://example.com/v1"
    access_key: "def"
server:
  bind: "0.0.0.0:9000"
data_path: "/tmp/xrates"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        config.validate().unwrap();
        assert_eq!(config.base_currency, "USD");
        assert_eq!(config.supported_currencies.len(), 3);
        assert_eq!(config.round_places, 4);
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
        assert_eq!(
            config.providers.exchange_rate.base_url,
            "http://example.com/v6"
        );
        assert_eq!(config.providers.exchange_rate.api_key.as_deref(), Some("abc"));
        assert_eq!(config.providers.history.access_key.as_deref(), Some("def"));
        assert_eq!(config.providers.history.base_currency, "EUR");
        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/xrates")
        );
        assert_eq!(
            config.media_path().unwrap(),
            PathBuf::from("/tmp/xrates/media")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        config.validate().unwrap();
        assert_eq!(config.base_currency, "RUB");
        assert_eq!(config.round_places, 6);
        assert_eq!(config.supported_currencies.len(), 30);
        assert!(config.is_supported("NOK"));
        assert!(!config.is_supported("XXX"));
        assert_eq!(
            config.providers.history.base_url,
            "https://api.exchangeratesapi.io/v1"
        );
    }

    #[test]
    fn test_invalid_codes_are_rejected() {
        let config: AppConfig =
            serde_yaml::from_str(r#"supported_currencies: ["USD", "eur"]"#).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("\"eur\""));

        let config: AppConfig = serde_yaml::from_str(
            r#"
base_currency: "GBP"
supported_currencies: ["USD", "EUR"]
"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_places_is_bounded() {
        let config: AppConfig = serde_yaml::from_str("round_places: 15").unwrap();
        config.validate().unwrap();

        let config: AppConfig = serde_yaml::from_str("round_places: 400").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("round_places"));
    }

    #[test]
    fn test_load_from_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), "round_places: 2\n").unwrap();
        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.round_places, 2);

        assert!(AppConfig::load_from_path("/nonexistent/xrates.yaml").is_err());
    }

    #[test]
    fn test_is_currency_code() {
        assert!(is_currency_code("USD"));
        assert!(!is_currency_code("US"));
        assert!(!is_currency_code("usd"));
        assert!(!is_currency_code("USDX"));
        assert!(!is_currency_code("ДОЛ"));
    }
}
