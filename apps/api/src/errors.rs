use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::RateLimited { message } => AppError::RateLimited(message),
            LlmError::QuotaExceeded { message } => AppError::QuotaExceeded(message),
            other => AppError::Inference(other.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            conflict @ StoreError::Conflict => AppError::Conflict(conflict.to_string()),
            other => AppError::Persistence(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Authentication required".to_string(),
            ),
            AppError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Access denied".to_string(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::RateLimited(msg) => {
                tracing::warn!("Inference rate limited: {msg}");
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMITED",
                    "The AI provider is rate limiting requests, retry later".to_string(),
                )
            }
            AppError::QuotaExceeded(msg) => {
                tracing::error!("Inference quota exceeded: {msg}");
                (
                    StatusCode::PAYMENT_REQUIRED,
                    "QUOTA_EXCEEDED",
                    "The AI provider quota is exhausted".to_string(),
                )
            }
            AppError::Inference(msg) => {
                tracing::error!("Inference error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "INFERENCE_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::Persistence(msg) => {
                tracing::error!("Persistence error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_errors_keep_their_status() {
        let rate: AppError = LlmError::RateLimited {
            message: "slow down".to_string(),
        }
        .into();
        assert_eq!(rate.into_response().status(), StatusCode::TOO_MANY_REQUESTS);

        let quota: AppError = LlmError::QuotaExceeded {
            message: "no credit".to_string(),
        }
        .into();
        assert_eq!(quota.into_response().status(), StatusCode::PAYMENT_REQUIRED);

        let transport: AppError = LlmError::Transport {
            status: Some(500),
            message: "boom".to_string(),
        }
        .into();
        assert_eq!(transport.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_store_errors_map_to_conflict_or_500() {
        let conflict: AppError = StoreError::Conflict.into();
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let down: AppError = StoreError::Unavailable("pool closed".to_string()).into();
        assert_eq!(down.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
