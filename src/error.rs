// Error types for the store boundary and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

// Failures a ListingStore can report. NotFound must stay distinguishable
// from Failure so callers only offer a retry for the latter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("listing '{0}' not found")]
    NotFound(String),
    #[error("store operation failed: {0:#}")]
    Failure(#[from] anyhow::Error),
}

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String), // Malformed write body, rejected before the store
    StoreUnavailable(anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => AppError::NotFound(format!("Listing '{}' not found", id)),
            StoreError::Failure(e) => AppError::StoreUnavailable(e),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_message, retryable) = match self {
            AppError::NotFound(message) => {
                tracing::info!("Not found: {}", message);
                (message, false)
            }
            AppError::BadRequest(message) => {
                tracing::warn!("Rejected malformed request: {}", message);
                (message, false)
            }
            AppError::StoreUnavailable(e) => {
                tracing::error!("Listing store failure: {:?}", e);
                ("Listing store unavailable, please retry".to_string(), true)
            }
        };

        (status, Json(json!({ "error": error_message, "retryable": retryable }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_not_conflated_with_failure() {
        let not_found: AppError = StoreError::NotFound("abc".into()).into();
        let failure: AppError = StoreError::Failure(anyhow::anyhow!("connection reset")).into();

        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(failure.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn store_failure_body_is_marked_retryable() {
        let response = AppError::StoreUnavailable(anyhow::anyhow!("timeout")).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["retryable"], true);
    }
}
