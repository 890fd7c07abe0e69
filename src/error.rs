use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::models::order::OrderStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("invalid transition: {role} may not move order from {from} to {to}")]
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
        role: &'static str,
    },

    #[error("order already assigned to another courier")]
    AlreadyAssigned,

    #[error("order is no longer claimable")]
    NotReady,

    #[error("courier is not eligible for dispatch")]
    NotEligible,

    #[error("no location recorded yet")]
    LocationUnavailable,

    /// A store call failed or timed out without confirming the write.
    /// Claims and transitions fail closed on this; a lost race is never
    /// reported as infrastructure failure or vice versa.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::InvalidTransition { .. } => (StatusCode::CONFLICT, "invalid_transition"),
            AppError::AlreadyAssigned => (StatusCode::CONFLICT, "already_assigned"),
            AppError::NotReady => (StatusCode::CONFLICT, "not_ready"),
            AppError::NotEligible => (StatusCode::FORBIDDEN, "not_eligible"),
            AppError::LocationUnavailable => (StatusCode::NOT_FOUND, "location_unavailable"),
            AppError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": code,
        }));

        (status, body).into_response()
    }
}
