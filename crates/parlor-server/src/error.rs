use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use parlor_shared::TokenError;
use parlor_store::StoreError;

use crate::rate_limit::RateLimitExceeded;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, unknown or expired session.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    RateLimited(#[from] RateLimitExceeded),

    /// Access-token verification failure. Deliberately uniform: callers
    /// learn nothing about why the token was rejected.
    #[error("Invalid or expired token")]
    InvalidToken(#[source] TokenError),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            ApiError::InvalidToken(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Store(store) => match store {
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
                StoreError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
                StoreError::InvalidInput(_) => (StatusCode::BAD_REQUEST, self.to_string()),
                StoreError::Io(_) | StoreError::Json(_) | StoreError::InvalidCollection(_) => {
                    tracing::error!(error = %store, "Persistence failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Persistence failure".to_string(),
                    )
                }
            },
            ApiError::Internal(_) => {
                tracing::error!(error = %self, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
