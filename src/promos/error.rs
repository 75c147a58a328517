use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};

use crate::error::ErrorResponse;
use crate::promos::engine::PromoViolation;
use crate::store::StoreError;

/// Error types for promo operations
#[derive(Debug, thiserror::Error)]
pub enum PromoError {
    /// No promo carries the (normalized) code
    #[error("Promo code not found: {0}")]
    CodeNotFound(String),

    #[error("Promo not found: {0}")]
    NotFound(i64),

    #[error("Invalid promo definition: {}", .0.join("; "))]
    InvalidDefinition(Vec<String>),

    #[error("Promo code already exists: {0}")]
    DuplicateCode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] validator::ValidationErrors),

    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for PromoError {
    fn from(err: StoreError) -> Self {
        PromoError::Store(err)
    }
}

impl PromoError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PromoError::CodeNotFound(_) => StatusCode::NOT_FOUND,
            PromoError::NotFound(_) => StatusCode::NOT_FOUND,
            PromoError::InvalidDefinition(_) => StatusCode::BAD_REQUEST,
            PromoError::DuplicateCode(_) => StatusCode::CONFLICT,
            PromoError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PromoError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PromoError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            PromoError::CodeNotFound(code) => {
                debug!("Promo code {} not found", code);
                ErrorResponse::new("PROMO_NOT_FOUND", PromoViolation::NotFound.to_string())
                    .with_details(serde_json::json!({ "code": code }))
            }
            PromoError::NotFound(id) => {
                ErrorResponse::new("NOT_FOUND", format!("Promo with id {} not found", id))
            }
            PromoError::InvalidDefinition(problems) => {
                ErrorResponse::new("VALIDATION_ERROR", "Invalid promo definition")
                    .with_details(serde_json::json!({ "errors": problems }))
            }
            PromoError::DuplicateCode(code) => {
                ErrorResponse::new("CONFLICT", format!("Promo code {} already exists", code))
            }
            PromoError::InvalidRequest(errors) => {
                ErrorResponse::new("VALIDATION_ERROR", "Request validation failed").with_details(
                    serde_json::to_value(errors).unwrap_or(serde_json::json!({})),
                )
            }
            PromoError::Store(err) => {
                error!("Promo storage error: {:?}", err);
                ErrorResponse::internal("DATABASE_ERROR", "A database error occurred", err.to_string())
            }
        };

        (status, Json(body)).into_response()
    }
}
