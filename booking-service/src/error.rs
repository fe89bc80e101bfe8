//! Payment-domain error taxonomy.
//!
//! Errors raised while creating intents or reconciling webhook events.
//! Booking CRUD handlers use the shared `service_core::error::AppError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),

    #[error("amount is below the minimum chargeable amount")]
    AmountTooSmall { min_amount: f64 },

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("payment intent not found")]
    IntentNotFound,

    #[error("webhook signature verification failed: {0}")]
    SignatureVerification(String),

    #[error("missing or malformed intent metadata: {0}")]
    MissingMetadata(String),

    #[error("malformed webhook payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("booking store error: {0}")]
    Store(#[from] mongodb::error::Error),
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        PaymentError::Gateway(err.to_string())
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        match self {
            PaymentError::Validation(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            PaymentError::AmountTooSmall { min_amount } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Amount is below the minimum chargeable amount",
                    "minAmount": min_amount,
                })),
            )
                .into_response(),
            PaymentError::Gateway(message) => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("Payment gateway error: {}", message) })),
            )
                .into_response(),
            PaymentError::IntentNotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Payment intent not found" })),
            )
                .into_response(),
            // Mirrors the gateway-facing contract: a plain 400 body, never a
            // booking side effect.
            PaymentError::SignatureVerification(message) => (
                StatusCode::BAD_REQUEST,
                format!("Webhook Error: {}", message),
            )
                .into_response(),
            PaymentError::MissingMetadata(message) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            PaymentError::Payload(err) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid webhook payload: {}", err) })),
            )
                .into_response(),
            // Transient persistence failure: surfacing a 500 from the webhook
            // route makes the provider redeliver.
            PaymentError::Store(err) => {
                tracing::error!(error = %err, "booking store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Booking store error" })),
                )
                    .into_response()
            }
        }
    }
}
