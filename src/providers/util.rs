use crate::core::currency::ProviderError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

const USER_AGENT: &str = concat!("xrates/", env!("CARGO_PKG_VERSION"));

/// Builds the HTTP client shared by a provider. Every request is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
}

/// Issues a GET and decodes the JSON body.
///
/// `label` is what gets logged in place of the URL, which carries the API key.
/// Transport errors are stripped of the URL for the same reason.
///
/// Providers report failures in a JSON envelope even on 4xx/5xx responses.
/// `rejection` pulls the reason out of such a body; bodies it cannot read
/// surface as [`ProviderError::Status`].
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    label: &str,
    rejection: impl FnOnce(&str) -> Option<String>,
) -> Result<T, ProviderError> {
    debug!("Requesting rates from {label}");
    let response = client
        .get(url)
        .send()
        .await
        .map_err(reqwest::Error::without_url)?;

    let status = response.status();
    let text = response.text().await.map_err(reqwest::Error::without_url)?;
    if !status.is_success() {
        error!(%status, "Rate provider {label} returned an error status");
        return Err(match rejection(&text) {
            Some(reason) => ProviderError::Rejected(reason),
            None => ProviderError::Status(status),
        });
    }

    serde_json::from_str(&text).map_err(|e| {
        error!(error = ?e, response = %text, "Failed to parse rate provider response");
        ProviderError::Malformed(format!("{label}: {e}"))
    })
}

/// Replaces a secret in `url` so it can be logged.
pub fn redact(url: &str, secret: &str) -> String {
    if secret.is_empty() {
        url.to_string()
    } else {
        url.replace(secret, "***")
    }
}
