use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::state_machine::{TransitionCtx, apply};
use crate::models::order::{CancellationReason, Order, OrderStatus};
use crate::state::AppState;
use crate::store::orders::UpdateError;

/// Cancels an order with a reason from the closed code set. Allowed from
/// Pending or InTransit only. The prior driver binding is retained for audit;
/// only restore clears it.
pub fn cancel(
    state: &AppState,
    order_id: Uuid,
    reason: CancellationReason,
) -> Result<Order, AppError> {
    let observed = state
        .orders
        .get(order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?
        .status;

    cancel_from(state, order_id, observed, reason)
}

/// Tries the conditional cancel from `observed`. A writer that advanced the
/// order between our read and the apply makes the apply lose with the actual
/// status; if that status is still cancelable the cancel is retried from it,
/// so only a genuinely terminal order surfaces `OrderNotCancelable`.
fn cancel_from(
    state: &AppState,
    order_id: Uuid,
    mut observed: OrderStatus,
    reason: CancellationReason,
) -> Result<Order, AppError> {
    let ctx = TransitionCtx {
        reason: Some(reason),
        ..Default::default()
    };

    loop {
        if observed.is_terminal() {
            return Err(AppError::OrderNotCancelable { current: observed });
        }

        match apply(state, order_id, observed, OrderStatus::Canceled, ctx) {
            Ok(order) => return Ok(order),
            Err(UpdateError::NotFound) => {
                return Err(AppError::NotFound(format!("order {order_id} not found")));
            }
            Err(UpdateError::StatusIs(actual)) => observed = actual,
        }
    }
}

/// The one backward edge: Canceled -> Pending. Clears the reason and any
/// prior driver binding so the order re-enters the assignable pool.
pub fn restore(state: &AppState, order_id: Uuid) -> Result<Order, AppError> {
    let result = apply(
        state,
        order_id,
        OrderStatus::Canceled,
        OrderStatus::Pending,
        TransitionCtx::default(),
    );

    match result {
        Ok(order) => {
            info!(order_id = %order.id, "order restored to pending");
            Ok(order)
        }
        Err(UpdateError::NotFound) => {
            Err(AppError::NotFound(format!("order {order_id} not found")))
        }
        Err(UpdateError::StatusIs(current)) => Err(AppError::OrderNotRestorable { current }),
    }
}
