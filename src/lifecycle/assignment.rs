use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::lifecycle::state_machine::{TransitionCtx, apply};
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;
use crate::store::orders::UpdateError;

/// Binds a driver to a Pending order, moving it to InTransit. The whole
/// operation is one conditional update gated on the status still being
/// Pending: of two operators racing on the same order, exactly one wins and
/// the loser sees `OrderNotAssignable` carrying the winner's status.
pub fn assign(state: &AppState, order_id: Uuid, driver_id: Uuid) -> Result<Order, AppError> {
    if !state.drivers.exists(driver_id) {
        return Err(AppError::DriverNotFound(driver_id));
    }

    let ctx = TransitionCtx {
        driver_id: Some(driver_id),
        ..Default::default()
    };

    match apply(state, order_id, OrderStatus::Pending, OrderStatus::InTransit, ctx) {
        Ok(order) => {
            info!(order_id = %order.id, driver_id = %driver_id, "driver assigned");
            Ok(order)
        }
        Err(UpdateError::NotFound) => {
            Err(AppError::NotFound(format!("order {order_id} not found")))
        }
        Err(UpdateError::StatusIs(current)) => {
            state.metrics.assignment_conflicts_total.inc();
            Err(AppError::OrderNotAssignable { current })
        }
    }
}

/// Swaps the driver on an order already in transit. No status change, no
/// lifecycle event; not reachable through `assign`.
pub fn reassign(state: &AppState, order_id: Uuid, driver_id: Uuid) -> Result<Order, AppError> {
    if !state.drivers.exists(driver_id) {
        return Err(AppError::DriverNotFound(driver_id));
    }

    let result = state
        .orders
        .update_if_status(order_id, OrderStatus::InTransit, |order| {
            order.driver_id = Some(driver_id);
        });

    match result {
        Ok(order) => {
            state.metrics.reassignments_total.inc();
            info!(order_id = %order.id, driver_id = %driver_id, "driver reassigned");
            Ok(order)
        }
        Err(UpdateError::NotFound) => {
            Err(AppError::NotFound(format!("order {order_id} not found")))
        }
        Err(UpdateError::StatusIs(current)) => Err(AppError::OrderNotAssignable { current }),
    }
}
