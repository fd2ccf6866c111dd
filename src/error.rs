use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::order::OrderStatus;

/// Tagged operation outcomes. The state-conflict variants carry the order's
/// actual current status so consoles can refresh instead of retrying against
/// a stale view.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unknown cancellation reason: {0}")]
    InvalidReason(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("driver {0} not found")]
    DriverNotFound(uuid::Uuid),

    #[error("operator identity required")]
    Unauthorized,

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order is not assignable: status is {current}")]
    OrderNotAssignable { current: OrderStatus },

    #[error("order is not cancelable: status is {current}")]
    OrderNotCancelable { current: OrderStatus },

    #[error("order is not restorable: status is {current}")]
    OrderNotRestorable { current: OrderStatus },

    #[error("rate limited: retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: i64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The order status a conflicting caller raced against, if this outcome
    /// is a state conflict.
    pub fn conflicting_status(&self) -> Option<OrderStatus> {
        match self {
            Self::InvalidTransition { from, .. } => Some(*from),
            Self::OrderNotAssignable { current }
            | Self::OrderNotCancelable { current }
            | Self::OrderNotRestorable { current } => Some(*current),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::BadRequest(_) | AppError::InvalidReason(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::DriverNotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidTransition { .. }
            | AppError::OrderNotAssignable { .. }
            | AppError::OrderNotCancelable { .. }
            | AppError::OrderNotRestorable { .. } => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = json!({ "error": self.to_string() });
        if let Some(current) = self.conflicting_status() {
            body["current_status"] = json!(current);
        }
        if let AppError::RateLimited { retry_after_secs } = &self {
            body["retry_after_secs"] = json!(retry_after_secs);
        }

        (status, Json(body)).into_response()
    }
}
