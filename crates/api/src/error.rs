//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use payments::PaymentError;
use store::StoreError;
use thiserror::Error;

const NOT_FOUND_MESSAGE: &str = "Item not found";
const INTERNAL_MESSAGE: &str = "Internal server error";

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A looked-up entity does not exist.
    #[error("Item not found")]
    NotFound,
    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),
    /// Payment lifecycle error.
    #[error(transparent)]
    Payment(#[from] PaymentError),
    /// Store error outside the payment lifecycle.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the status code and the message shown to the client.
    pub fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::NotFound => (StatusCode::BAD_REQUEST, NOT_FOUND_MESSAGE.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Payment(PaymentError::Store(err)) | ApiError::Store(err) => {
                store_error_to_response(err)
            }
            ApiError::Payment(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            ApiError::Internal(_) => internal(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(error = %self, "internal server error");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn store_error_to_response(err: &StoreError) -> (StatusCode, String) {
    match err {
        StoreError::NotFound { .. } => (StatusCode::BAD_REQUEST, NOT_FOUND_MESSAGE.to_string()),
        StoreError::ConcurrencyConflict { .. } | StoreError::DuplicatePayment { .. } => {
            (StatusCode::CONFLICT, err.to_string())
        }
        StoreError::Database(_)
        | StoreError::Migration(_)
        | StoreError::Serialization(_)
        | StoreError::CorruptRow(_) => internal(),
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        INTERNAL_MESSAGE.to_string(),
    )
}
