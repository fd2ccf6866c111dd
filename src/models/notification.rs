use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    OrderAssigned,
    OrderDelivered,
    OrderCanceled,
    OrderRestored,
    SupportPing,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    Unread,
    Read,
}

/// Durable operator alert. Rows are never deleted; the only mutation is the
/// unread -> read flip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub kind: NotificationKind,
    pub message: String,
    pub subject_id: Uuid,
    pub status: ReadStatus,
    pub created_at: DateTime<Utc>,
}

/// Payload pushed on the operator broadcast channel. Live push is
/// best-effort; the persisted Notification row is the ledger of record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub kind: NotificationKind,
    pub message: String,
    pub subject_id: Uuid,
    pub timestamp: DateTime<Utc>,
}
