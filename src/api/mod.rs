//! HTTP surface: three read-only JSON endpoints plus uploaded media.

pub mod error;
pub mod handlers;

use crate::core::catalog::Catalog;
use crate::core::config::AppConfig;
use crate::core::currency::{CurrencyRateProvider, HistoricalRateProvider};
use axum::Router;
use axum::routing::get;
use error::request_not_processed;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<dyn Catalog>,
    pub latest: Arc<dyn CurrencyRateProvider>,
    pub history: Arc<dyn HistoricalRateProvider>,
}

/// Builds the application router. Flag images are served from `media_dir` when given.
pub fn router(state: AppState, media_dir: Option<PathBuf>) -> Router {
    let mut app = Router::new()
        .route(
            "/currencies",
            get(handlers::currencies).fallback(request_not_processed),
        )
        .route(
            "/conversion",
            get(handlers::conversion).fallback(request_not_processed),
        )
        .route(
            "/history",
            get(handlers::history).fallback(request_not_processed),
        )
        .with_state(state);

    if let Some(dir) = media_dir {
        app = app.nest_service("/media", ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
