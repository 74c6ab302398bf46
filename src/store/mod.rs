pub mod disk;
pub mod memory;

use crate::core::catalog::Catalog;
use crate::core::config::AppConfig;
use anyhow::Result;
use disk::FjallCatalog;
use std::sync::Arc;
use tracing::info;

/// Opens the persistent catalog under the configured data directory.
pub fn open_catalog(config: &AppConfig) -> Result<Arc<dyn Catalog>> {
    let path = config.default_data_path()?.join("catalog");
    info!("Using catalog at {}", path.display());
    Ok(Arc::new(FjallCatalog::open(&path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::NewCurrency;

    #[tokio::test]
    async fn test_open_catalog_under_data_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            data_path: Some(dir.path().to_string_lossy().into_owned()),
            ..AppConfig::default()
        };
        let catalog = open_catalog(&config).unwrap();
        catalog
            .add_currency(NewCurrency {
                name: "Euro".to_string(),
                short_name: "EUR".to_string(),
                symbol: Some("&euro;".to_string()),
                flag: None,
            })
            .await
            .unwrap();
        assert!(dir.path().join("catalog").is_dir());
        assert_eq!(catalog.list_currencies().await.unwrap().len(), 1);
    }
}
