//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use esim_shop_core::{CheckoutError, FieldErrors, ShopError, SubmissionError};
use esim_shop_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unauthorized - missing or invalid session.
    #[error("unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// One or more fields failed validation.
    #[error("validation failed")]
    Validation(FieldErrors),

    /// Conflict - invalid state transition.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The payment was declined.
    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    /// The payment gateway did not answer in time.
    #[error("payment gateway timed out")]
    GatewayTimeout,

    /// The service is shutting down or cannot accept the request right now.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "A valid session is required".to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_failed",
                "One or more fields are invalid".to_string(),
                serde_json::to_value(errors).ok(),
            ),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone(), None),
            Self::PaymentDeclined(reason) => (
                StatusCode::PAYMENT_REQUIRED,
                "payment_declined",
                self.to_string(),
                Some(serde_json::json!({ "reason": reason })),
            ),
            Self::GatewayTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "gateway_timeout",
                self.to_string(),
                None,
            ),
            Self::Unavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                msg.clone(),
                None,
            ),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::PaymentMethodNotFound { id } => {
                Self::NotFound(format!("payment method not found: {id}"))
            }
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<SubmissionError> for ApiError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Declined { reason } => Self::PaymentDeclined(reason),
            SubmissionError::GatewayTimeout => Self::GatewayTimeout,
            SubmissionError::Cancelled => Self::Unavailable(err.to_string()),
            SubmissionError::Unavailable(msg) => Self::Internal(msg),
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::NotAtReview { .. }
            | CheckoutError::SubmissionInProgress
            | CheckoutError::AlreadySubmitted => Self::Conflict(err.to_string()),
            CheckoutError::Invalid(errors) => Self::Validation(errors),
            CheckoutError::Submission(e) => e.into(),
        }
    }
}

impl From<ShopError> for ApiError {
    fn from(err: ShopError) -> Self {
        match err {
            ShopError::PaymentMethodNotFound { .. }
            | ShopError::OrderNotFound { .. }
            | ShopError::CheckoutNotFound { .. } => Self::NotFound(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_errors_map_to_statuses() {
        let conflict: ApiError = CheckoutError::AlreadySubmitted.into();
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let declined: ApiError = CheckoutError::Submission(SubmissionError::Declined {
            reason: "card declined".into(),
        })
        .into();
        assert_eq!(declined.into_response().status(), StatusCode::PAYMENT_REQUIRED);

        let timeout: ApiError = SubmissionError::GatewayTimeout.into();
        assert_eq!(timeout.into_response().status(), StatusCode::GATEWAY_TIMEOUT);

        let invalid: ApiError = CheckoutError::Invalid(FieldErrors::new()).into();
        assert_eq!(invalid.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn shop_not_found_is_404() {
        let err: ApiError = ShopError::CheckoutNotFound {
            checkout_id: "abc".into(),
        }
        .into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let err: ApiError = ShopError::OrderNotFound {
            order_id: "ORD-ABCDEFGH".into(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg == "order not found: ORD-ABCDEFGH"));
    }

    #[test]
    fn store_not_found_is_404() {
        let err: ApiError = StoreError::PaymentMethodNotFound { id: "pm_x".into() }.into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
