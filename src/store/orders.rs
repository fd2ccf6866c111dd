use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::order::{Order, OrderDraft, OrderStatus};

/// Outcome of a status-gated write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    NotFound,
    /// The order was found but its status did not match the expected one.
    /// Carries the status actually observed.
    StatusIs(OrderStatus),
}

/// Single source of truth for order rows. All status mutations go through
/// `update_if_status`, which holds one entry guard across the check and the
/// write, so two transitions can never both observe the same prior state and
/// both succeed.
pub struct OrderStore {
    orders: DashMap<Uuid, Order>,
    next_number: AtomicU64,
}

impl OrderStore {
    pub fn new() -> Self {
        Self {
            orders: DashMap::new(),
            next_number: AtomicU64::new(1001),
        }
    }

    /// Seals a checkout draft into a Pending order with a fresh order number.
    /// None means the draft's total overflows; nothing is persisted and no
    /// order number is consumed.
    pub fn create(&self, draft: OrderDraft) -> Option<Order> {
        draft.total_cents()?;
        let seq = self.next_number.fetch_add(1, Ordering::Relaxed);
        let order = draft.into_order(format!("ORD-{seq}"))?;
        self.orders.insert(order.id, order.clone());
        Some(order)
    }

    pub fn get(&self, id: Uuid) -> Option<Order> {
        self.orders.get(&id).map(|entry| entry.value().clone())
    }

    /// Applies `mutate` to the order only if its status is still `expected`.
    /// The check and the write happen under one entry guard; callers must not
    /// await inside `mutate`.
    pub fn update_if_status<F>(
        &self,
        id: Uuid,
        expected: OrderStatus,
        mutate: F,
    ) -> Result<Order, UpdateError>
    where
        F: FnOnce(&mut Order),
    {
        let mut entry = self.orders.get_mut(&id).ok_or(UpdateError::NotFound)?;
        let order = entry.value_mut();

        if order.status != expected {
            return Err(UpdateError::StatusIs(order.status));
        }

        mutate(order);
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    /// Point-in-time clone of all rows. One iteration pass, so a query built
    /// on the result never sees a row twice or misses one that existed when
    /// the pass ran.
    pub fn snapshot(&self) -> Vec<Order> {
        self.orders
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

impl Default for OrderStore {
    fn default() -> Self {
        Self::new()
    }
}
