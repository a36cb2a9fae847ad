use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::shipment::ShipmentStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        from: ShipmentStatus,
        to: ShipmentStatus,
    },

    #[error("courier {0} is restricted from new assignments")]
    CourierRestricted(Uuid),

    #[error("shipment {0} is locked; fees cannot change after a terminal delivery outcome")]
    ShipmentLocked(Uuid),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("transaction {0} not found")]
    TransactionNotFound(Uuid),

    #[error("transaction {0} is already processed")]
    TransactionAlreadyProcessed(Uuid),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable snake_case label used in response bodies and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidTransition { .. } => "invalid_transition",
            AppError::CourierRestricted(_) => "courier_restricted",
            AppError::ShipmentLocked(_) => "shipment_locked",
            AppError::InvalidAmount(_) => "invalid_amount",
            AppError::TransactionNotFound(_) => "transaction_not_found",
            AppError::TransactionAlreadyProcessed(_) => "transaction_already_processed",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::Internal(_) => "internal",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidTransition { .. }
            | AppError::ShipmentLocked(_)
            | AppError::TransactionAlreadyProcessed(_) => StatusCode::CONFLICT,
            AppError::CourierRestricted(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidAmount(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::TransactionNotFound(_) | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}
