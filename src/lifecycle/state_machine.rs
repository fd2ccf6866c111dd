use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::NotificationKind;
use crate::models::order::{CancellationReason, Order, OrderStatus};
use crate::state::AppState;
use crate::store::orders::UpdateError;

/// Side fields a transition may need to commit together with the new status.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionCtx {
    pub driver_id: Option<Uuid>,
    pub reason: Option<CancellationReason>,
}

/// Forward edges of the lifecycle. The Canceled -> Pending restore edge is
/// deliberately absent: it is only reachable through the explicit restore
/// operation, never a generic transition call.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    matches!(
        (from, to),
        (OrderStatus::Pending, OrderStatus::InTransit)
            | (OrderStatus::Pending, OrderStatus::Canceled)
            | (OrderStatus::InTransit, OrderStatus::Delivered)
            | (OrderStatus::InTransit, OrderStatus::Canceled)
    )
}

pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
    match from {
        OrderStatus::Pending => vec![OrderStatus::InTransit, OrderStatus::Canceled],
        OrderStatus::InTransit => vec![OrderStatus::Delivered, OrderStatus::Canceled],
        OrderStatus::Delivered | OrderStatus::Canceled => vec![],
    }
}

/// Validates the edge from the order's current status and applies it. The
/// commit is gated on the status still being what was read, so a concurrent
/// transition makes this call lose with the winner's status in the error.
pub fn transition(
    state: &AppState,
    order_id: Uuid,
    target: OrderStatus,
    ctx: TransitionCtx,
) -> Result<Order, AppError> {
    let current = state
        .orders
        .get(order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?
        .status;

    if !is_valid_transition(current, target) {
        state
            .metrics
            .transitions_total
            .with_label_values(&[status_label(target), "rejected"])
            .inc();
        return Err(AppError::InvalidTransition {
            from: current,
            to: target,
        });
    }

    match target {
        OrderStatus::InTransit if ctx.driver_id.is_none() => {
            return Err(AppError::BadRequest(
                "transition to in_transit requires driver_id".to_string(),
            ));
        }
        OrderStatus::Canceled if ctx.reason.is_none() => {
            return Err(AppError::BadRequest(
                "transition to canceled requires a reason".to_string(),
            ));
        }
        _ => {}
    }

    apply(state, order_id, current, target, ctx).map_err(|err| match err {
        UpdateError::NotFound => AppError::NotFound(format!("order {order_id} not found")),
        UpdateError::StatusIs(actual) => AppError::InvalidTransition {
            from: actual,
            to: target,
        },
    })
}

/// Commits `expected -> target` as one conditional update, stamps the side
/// fields, and emits exactly one lifecycle event. Shared by the generic
/// transition call, assignment, cancellation, and restore.
pub(crate) fn apply(
    state: &AppState,
    order_id: Uuid,
    expected: OrderStatus,
    target: OrderStatus,
    ctx: TransitionCtx,
) -> Result<Order, UpdateError> {
    let result = state.orders.update_if_status(order_id, expected, |order| {
        order.status = target;
        match target {
            OrderStatus::InTransit => order.driver_id = ctx.driver_id,
            OrderStatus::Canceled => order.cancellation_reason = ctx.reason,
            OrderStatus::Delivered => order.delivered_at = Some(Utc::now()),
            OrderStatus::Pending => {
                // Restore edge: the order re-enters the assignable pool as if
                // newly created.
                order.cancellation_reason = None;
                order.driver_id = None;
            }
        }
    });

    let outcome = if result.is_ok() { "success" } else { "conflict" };
    state
        .metrics
        .transitions_total
        .with_label_values(&[status_label(target), outcome])
        .inc();

    let order = result?;

    state.fanout.publish(
        event_kind(target),
        format!("Order {} is now {}", order.order_number, target.label()),
        order.id,
    );

    info!(
        order_id = %order.id,
        order_number = %order.order_number,
        from = %expected,
        to = %target,
        "order transitioned"
    );

    Ok(order)
}

fn event_kind(target: OrderStatus) -> NotificationKind {
    match target {
        OrderStatus::Pending => NotificationKind::OrderRestored,
        OrderStatus::InTransit => NotificationKind::OrderAssigned,
        OrderStatus::Delivered => NotificationKind::OrderDelivered,
        OrderStatus::Canceled => NotificationKind::OrderCanceled,
    }
}

fn status_label(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "pending",
        OrderStatus::InTransit => "in_transit",
        OrderStatus::Delivered => "delivered",
        OrderStatus::Canceled => "canceled",
    }
}
