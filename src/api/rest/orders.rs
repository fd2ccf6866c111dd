use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::rest::auth::Operator;
use crate::error::AppError;
use crate::lifecycle::assignment;
use crate::lifecycle::cancellation;
use crate::lifecycle::state_machine::{self, TransitionCtx};
use crate::models::notification::NotificationKind;
use crate::models::order::{CancellationReason, Order, OrderDraft, OrderStatus};
use crate::query::{self, OrderQuery, Page, StatusCounts};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/counts", get(order_counts))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/transition", post(transition_order))
        .route("/orders/:id/assign", post(assign_driver))
        .route("/orders/:id/reassign", post(reassign_driver))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/restore", post(restore_order))
}

/// Checkout is the only caller that creates orders; this core never
/// originates them itself.
async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<OrderDraft>,
) -> Result<Json<Order>, AppError> {
    if draft.customer_name.trim().is_empty() {
        return Err(AppError::BadRequest("customer_name cannot be empty".to_string()));
    }
    if draft.items.is_empty() {
        return Err(AppError::BadRequest("order needs at least one item".to_string()));
    }

    let order = state.orders.create(draft).ok_or_else(|| {
        AppError::BadRequest("order total overflows the supported range".to_string())
    })?;
    state.fanout.publish(
        NotificationKind::NewOrder,
        format!("New order {} from {}", order.order_number, order.customer_name),
        order.id,
    );

    info!(order_id = %order.id, order_number = %order.order_number, "order created");
    Ok(Json(order))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OrderQuery>,
) -> Json<Page> {
    Json(query::list(&state, &query))
}

async fn order_counts(State(state): State<Arc<AppState>>) -> Json<StatusCounts> {
    Json(query::status_counts(&state))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub target: OrderStatus,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
    #[serde(default)]
    pub reason: Option<String>,
}

async fn transition_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    operator: Operator,
    Json(payload): Json<TransitionRequest>,
) -> Result<Json<Order>, AppError> {
    let reason = payload.reason.map(|raw| parse_reason(&raw)).transpose()?;

    if let Some(driver_id) = payload.driver_id {
        if !state.drivers.exists(driver_id) {
            return Err(AppError::DriverNotFound(driver_id));
        }
    }

    let ctx = TransitionCtx {
        driver_id: payload.driver_id,
        reason,
    };

    let order = state_machine::transition(&state, id, payload.target, ctx)?;
    info!(order_id = %id, operator_id = %operator.id, target = %payload.target, "transition applied");
    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub driver_id: Uuid,
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    operator: Operator,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Order>, AppError> {
    let order = assignment::assign(&state, id, payload.driver_id)?;
    info!(order_id = %id, operator_id = %operator.id, driver_id = %payload.driver_id, "assign applied");
    Ok(Json(order))
}

async fn reassign_driver(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    operator: Operator,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<Order>, AppError> {
    let order = assignment::reassign(&state, id, payload.driver_id)?;
    info!(order_id = %id, operator_id = %operator.id, driver_id = %payload.driver_id, "reassign applied");
    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    operator: Operator,
    Json(payload): Json<CancelRequest>,
) -> Result<Json<Order>, AppError> {
    let reason = parse_reason(&payload.reason)?;
    let order = cancellation::cancel(&state, id, reason)?;
    info!(order_id = %id, operator_id = %operator.id, reason = reason.code(), "cancel applied");
    Ok(Json(order))
}

async fn restore_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    operator: Operator,
) -> Result<Json<Order>, AppError> {
    let order = cancellation::restore(&state, id)?;
    info!(order_id = %id, operator_id = %operator.id, "restore applied");
    Ok(Json(order))
}

fn parse_reason(raw: &str) -> Result<CancellationReason, AppError> {
    CancellationReason::from_str(raw).map_err(|()| AppError::InvalidReason(raw.to_string()))
}
