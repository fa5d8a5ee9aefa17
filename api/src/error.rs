use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use market::MarketError;
use serde_json::json;
use tracing::error;

/// HTTP face of [`MarketError`].
#[derive(Debug)]
pub struct ApiError(pub MarketError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MarketError::NotFound(_)
            | MarketError::InvalidInterval(_)
            // Config authority down: nothing is considered enabled.
            | MarketError::ConfigUnavailable(_) => StatusCode::NOT_FOUND,
            MarketError::UnsupportedExchange(_) | MarketError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        let body = json!({ "error": self.0.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
