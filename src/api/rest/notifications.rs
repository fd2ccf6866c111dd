use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::rest::auth::Operator;
use crate::error::AppError;
use crate::models::notification::Notification;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/notifications", get(fetch_notifications))
        .route("/notifications/:id/read", post(mark_read))
        .route("/notifications/read-all", post(mark_all_read))
        .route("/support/ping", post(support_ping))
}

#[derive(Serialize)]
struct NotificationsResponse {
    unread: Vec<Notification>,
    read: Vec<Notification>,
}

/// The durable ledger, partitioned. Consoles call this on (re)connect to
/// reconcile their local unread view instead of trusting incremental counts.
async fn fetch_notifications(State(state): State<Arc<AppState>>) -> Json<NotificationsResponse> {
    let (unread, read) = state.fanout.fetch();
    Json(NotificationsResponse { unread, read })
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    _operator: Operator,
) -> Result<Json<Notification>, AppError> {
    let row = state.fanout.mark_read(id)?;
    Ok(Json(row))
}

#[derive(Serialize)]
struct MarkAllResponse {
    marked: usize,
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    _operator: Operator,
) -> Json<MarkAllResponse> {
    let marked = state.fanout.mark_all_read();
    Json(MarkAllResponse { marked })
}

#[derive(Deserialize)]
pub struct SupportPingRequest {
    pub message: String,
}

async fn support_ping(
    State(state): State<Arc<AppState>>,
    operator: Operator,
    Json(payload): Json<SupportPingRequest>,
) -> Result<Json<Notification>, AppError> {
    if payload.message.trim().is_empty() {
        return Err(AppError::BadRequest("message cannot be empty".to_string()));
    }

    let row = state.fanout.support_ping(operator.id, payload.message)?;
    Ok(Json(row))
}
