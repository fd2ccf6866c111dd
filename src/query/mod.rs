use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::order::{CancellationReason, Order, OrderStatus};
use crate::state::AppState;

const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    Amount,
    OrderNumber,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// One status bucket's list request. Extra filters are bucket specific:
/// `reason` for Canceled, `driver_id` for InTransit, the delivered range for
/// Delivered; a filter for another bucket simply matches nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderQuery {
    pub status: OrderStatus,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub sort_order: SortDirection,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub reason: Option<CancellationReason>,
    #[serde(default)]
    pub driver_id: Option<Uuid>,
    #[serde(default)]
    pub delivered_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_to: Option<DateTime<Utc>>,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    20
}

#[derive(Debug, Serialize)]
pub struct Page {
    pub orders: Vec<Order>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_transit: usize,
    pub delivered: usize,
    pub canceled: usize,
}

fn matches(order: &Order, query: &OrderQuery) -> bool {
    if order.status != query.status {
        return false;
    }

    if let Some(search) = &query.search {
        let needle = search.to_lowercase();
        let hit = order.order_number.to_lowercase().contains(&needle)
            || order.customer_name.to_lowercase().contains(&needle);
        if !hit {
            return false;
        }
    }

    if let Some(reason) = query.reason {
        if order.cancellation_reason != Some(reason) {
            return false;
        }
    }

    if let Some(driver_id) = query.driver_id {
        if order.driver_id != Some(driver_id) {
            return false;
        }
    }

    if query.delivered_from.is_some() || query.delivered_to.is_some() {
        let Some(delivered_at) = order.delivered_at else {
            return false;
        };
        if query.delivered_from.is_some_and(|from| delivered_at < from) {
            return false;
        }
        if query.delivered_to.is_some_and(|to| delivered_at > to) {
            return false;
        }
    }

    true
}

fn compare(a: &Order, b: &Order, field: SortField) -> Ordering {
    let primary = match field {
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Amount => a.amount_cents.cmp(&b.amount_cents),
        SortField::OrderNumber => a.order_number.cmp(&b.order_number),
    };
    // Order numbers are unique, so the tiebreak makes the ordering total and
    // a page boundary can never split rows that compare equal.
    primary.then_with(|| a.order_number.cmp(&b.order_number))
}

/// Filtered, sorted page over one status bucket plus the total match count.
/// Works on a single snapshot of the store: one clone-out pass, then sort and
/// page in memory, so the call never sees a row twice or skips one that
/// matched when the pass ran.
pub fn list(state: &AppState, query: &OrderQuery) -> Page {
    let mut rows: Vec<Order> = state
        .orders
        .snapshot()
        .into_iter()
        .filter(|order| matches(order, query))
        .collect();

    rows.sort_by(|a, b| {
        let ord = compare(a, b, query.sort_by);
        match query.sort_order {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    let total = rows.len();
    let page_size = query.page_size.clamp(1, MAX_PAGE_SIZE);
    // Saturate so an absurd page number from the query string falls through
    // to the empty-page path instead of overflowing.
    let offset = query
        .page
        .max(1)
        .saturating_sub(1)
        .saturating_mul(page_size);

    let orders = if offset >= total {
        Vec::new()
    } else {
        rows.into_iter().skip(offset).take(page_size).collect()
    };

    Page { orders, total }
}

/// Match count for a bucket + filter, ignoring pagination. Backs the badge
/// counts next to each bucket tab.
pub fn count(state: &AppState, query: &OrderQuery) -> usize {
    state
        .orders
        .snapshot()
        .iter()
        .filter(|order| matches(order, query))
        .count()
}

/// Per-bucket totals for the dashboard summary, from one snapshot pass.
pub fn status_counts(state: &AppState) -> StatusCounts {
    let mut counts = StatusCounts {
        pending: 0,
        in_transit: 0,
        delivered: 0,
        canceled: 0,
    };
    for order in state.orders.snapshot() {
        match order.status {
            OrderStatus::Pending => counts.pending += 1,
            OrderStatus::InTransit => counts.in_transit += 1,
            OrderStatus::Delivered => counts.delivered += 1,
            OrderStatus::Canceled => counts.canceled += 1,
        }
    }
    counts
}
