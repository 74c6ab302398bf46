use crate::core::catalog::CatalogError;
use crate::core::currency::ProviderError;
use crate::core::query::ValidationError;
use crate::core::rates::RateError;
use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, warn};

pub const REQUEST_ERROR_MESSAGE: &str = "Запрос не может быть обработан.";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Upstream(#[from] ProviderError),

    #[error("Unusable provider rates: {0}")]
    Rates(#[from] RateError),

    /// The request could not be read at all, e.g. a duplicated query parameter.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(what) => ApiError::NotFound(format!("{what} not found")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Rates(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation(e) => {
                debug!(error = ?e, "Rejected request parameters");
                json!({ "validation-error": e.to_string() })
            }
            ApiError::NotFound(detail) => {
                debug!("{detail}");
                json!({ "detail": detail })
            }
            ApiError::BadRequest(reason) => {
                debug!(%reason, "Unreadable request");
                json!({ "error": REQUEST_ERROR_MESSAGE })
            }
            ApiError::Upstream(_) | ApiError::Rates(_) => {
                warn!(error = %self, "Rate provider failure");
                json!({ "error": self.to_string() })
            }
            ApiError::Internal(_) => {
                error!(error = %self, "Request failed");
                json!({ "error": self.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Body returned for requests the endpoints do not handle, such as non-GET methods.
pub async fn request_not_processed() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": REQUEST_ERROR_MESSAGE })),
    )
        .into_response()
}
