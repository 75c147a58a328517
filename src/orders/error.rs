use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error, warn};

use crate::error::ErrorResponse;
use crate::store::StoreError;

/// Error types for order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Order not found")]
    NotFound,

    #[error("Customer not found: {0}")]
    CustomerNotFound(i64),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(String),

    #[error("Order was modified concurrently: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),
}

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrderError::NotFound => StatusCode::NOT_FOUND,
            OrderError::CustomerNotFound(_) => StatusCode::NOT_FOUND,
            OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
            OrderError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            OrderError::Conflict(_) => StatusCode::CONFLICT,
            OrderError::ValidationError(_) => StatusCode::BAD_REQUEST,
            OrderError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            OrderError::Store(err) => {
                error!("Order storage error: {:?}", err);
                ErrorResponse::internal(
                    "DATABASE_ERROR",
                    "The order could not be processed",
                    err.to_string(),
                )
            }
            OrderError::NotFound => ErrorResponse::new("ORDER_NOT_FOUND", "Order not found"),
            OrderError::CustomerNotFound(id) => {
                warn!("Order placed for missing customer {}", id);
                ErrorResponse::new("CUSTOMER_NOT_FOUND", format!("Customer {} not found", id))
            }
            OrderError::Forbidden(msg) => ErrorResponse::new("FORBIDDEN", msg.clone()),
            OrderError::InvalidTransition(msg) => {
                ErrorResponse::new("INVALID_STATUS_TRANSITION", msg.clone())
            }
            OrderError::Conflict(msg) => ErrorResponse::new("CONFLICT", msg.clone()),
            OrderError::ValidationError(msg) => {
                debug!("Order validation failed: {}", msg);
                ErrorResponse::new("VALIDATION_ERROR", msg.clone())
            }
            OrderError::InvalidRequest(errors) => {
                debug!("Order request invalid: {:?}", errors);
                ErrorResponse::new("VALIDATION_ERROR", "Request validation failed").with_details(
                    serde_json::to_value(errors).unwrap_or(serde_json::json!({})),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
