use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an order. Mutated only through the state machine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InTransit,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Human label for console display. Never stored on the order.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InTransit => "In transit",
            Self::Delivered => "Delivered",
            Self::Canceled => "Canceled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Canceled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Closed set of cancellation reason codes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    CustomerRequest,
    OutOfStock,
    DeliveryIssue,
    PaymentFailed,
    Other,
}

impl CancellationReason {
    pub fn label(self) -> &'static str {
        match self {
            Self::CustomerRequest => "Customer request",
            Self::OutOfStock => "Out of stock",
            Self::DeliveryIssue => "Delivery issue",
            Self::PaymentFailed => "Payment failed",
            Self::Other => "Other",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::CustomerRequest => "customer_request",
            Self::OutOfStock => "out_of_stock",
            Self::DeliveryIssue => "delivery_issue",
            Self::PaymentFailed => "payment_failed",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for CancellationReason {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer_request" => Ok(Self::CustomerRequest),
            "out_of_stock" => Ok(Self::OutOfStock),
            "delivery_issue" => Ok(Self::DeliveryIssue),
            "payment_failed" => Ok(Self::PaymentFailed),
            "other" => Ok(Self::Other),
            _ => Err(()),
        }
    }
}

/// Line item snapshot taken at order creation. Prices are in minor currency
/// units and are never re-read from the live catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub driver_id: Option<Uuid>,
    pub cancellation_reason: Option<CancellationReason>,
    pub customer_name: String,
    pub amount_cents: u64,
    pub items: Vec<OrderItem>,
    pub shift: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Pre-order aggregate handed over by the checkout collaborator. Converted
/// exactly once into an immutable Order + item snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderDraft {
    pub customer_name: String,
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shift: Option<String>,
}

impl OrderDraft {
    /// Checked order total in minor units. None means the draft's line items
    /// exceed the representable range and the draft must be rejected.
    pub fn total_cents(&self) -> Option<u64> {
        self.items.iter().try_fold(0u64, |total, item| {
            let line = item.unit_price_cents.checked_mul(u64::from(item.quantity))?;
            total.checked_add(line)
        })
    }

    /// Seals the draft into an order. The total is summed here and never
    /// recomputed afterwards; a draft whose total overflows yields None.
    pub fn into_order(self, order_number: String) -> Option<Order> {
        let amount_cents = self.total_cents()?;
        let now = Utc::now();

        Some(Order {
            id: Uuid::new_v4(),
            order_number,
            status: OrderStatus::Pending,
            driver_id: None,
            cancellation_reason: None,
            customer_name: self.customer_name,
            amount_cents,
            items: self.items,
            shift: self.shift,
            created_at: now,
            updated_at: now,
            delivered_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use uuid::Uuid;

    use super::{CancellationReason, OrderDraft, OrderItem, OrderStatus};

    #[test]
    fn terminal_statuses() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::InTransit.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
    }

    #[test]
    fn reason_codes_round_trip() {
        for reason in [
            CancellationReason::CustomerRequest,
            CancellationReason::OutOfStock,
            CancellationReason::DeliveryIssue,
            CancellationReason::PaymentFailed,
            CancellationReason::Other,
        ] {
            assert_eq!(CancellationReason::from_str(reason.code()), Ok(reason));
        }
    }

    #[test]
    fn unknown_reason_code_is_rejected() {
        assert!(CancellationReason::from_str("changed_my_mind").is_err());
    }

    #[test]
    fn draft_conversion_sums_amount_from_item_snapshot() {
        let draft = OrderDraft {
            customer_name: "Ada".to_string(),
            items: vec![
                OrderItem {
                    product_id: Uuid::new_v4(),
                    product_name: "Espresso beans".to_string(),
                    quantity: 2,
                    unit_price_cents: 1250,
                },
                OrderItem {
                    product_id: Uuid::new_v4(),
                    product_name: "Filter pack".to_string(),
                    quantity: 1,
                    unit_price_cents: 499,
                },
            ],
            shift: Some("morning".to_string()),
        };

        let order = draft.into_order("ORD-1001".to_string()).unwrap();

        assert_eq!(order.amount_cents, 2999);
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.driver_id.is_none());
        assert!(order.cancellation_reason.is_none());
        assert!(order.delivered_at.is_none());
    }

    #[test]
    fn draft_with_overflowing_total_is_rejected() {
        let overflowing_line = OrderDraft {
            customer_name: "Ada".to_string(),
            items: vec![OrderItem {
                product_id: Uuid::new_v4(),
                product_name: "item".to_string(),
                quantity: 3,
                unit_price_cents: u64::MAX / 2,
            }],
            shift: None,
        };
        assert!(overflowing_line.total_cents().is_none());
        assert!(overflowing_line.into_order("ORD-1001".to_string()).is_none());

        let overflowing_sum = OrderDraft {
            customer_name: "Ada".to_string(),
            items: vec![
                OrderItem {
                    product_id: Uuid::new_v4(),
                    product_name: "a".to_string(),
                    quantity: 1,
                    unit_price_cents: u64::MAX,
                },
                OrderItem {
                    product_id: Uuid::new_v4(),
                    product_name: "b".to_string(),
                    quantity: 1,
                    unit_price_cents: 1,
                },
            ],
            shift: None,
        };
        assert!(overflowing_sum.total_cents().is_none());
    }
}
