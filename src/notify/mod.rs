use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::notification::{LifecycleEvent, Notification, NotificationKind};
use crate::observability::metrics::Metrics;
use crate::store::notifications::NotificationStore;

/// Publishes operator alerts: every event is persisted to the ledger first,
/// then pushed best-effort on the broadcast channel. Consoles that miss the
/// push reconcile from the ledger via `fetch`.
///
/// The broadcast sender is handed in at construction so tests can subscribe
/// to (or ignore) the same transport the service uses.
pub struct Fanout {
    store: NotificationStore,
    events_tx: broadcast::Sender<LifecycleEvent>,
    ping_armed_at: DashMap<Uuid, DateTime<Utc>>,
    ping_cooldown: Duration,
    metrics: Metrics,
}

impl Fanout {
    pub fn new(
        events_tx: broadcast::Sender<LifecycleEvent>,
        ping_cooldown_secs: i64,
        metrics: Metrics,
    ) -> Self {
        Self {
            store: NotificationStore::new(),
            events_tx,
            ping_armed_at: DashMap::new(),
            ping_cooldown: Duration::seconds(ping_cooldown_secs),
            metrics,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events_tx.subscribe()
    }

    /// Persist-then-publish. A send with no live subscribers is not a
    /// failure; the row is already durable.
    pub fn publish(&self, kind: NotificationKind, message: String, subject_id: Uuid) -> Notification {
        let row = self.store.append(kind, message, subject_id);

        let _ = self.events_tx.send(LifecycleEvent {
            kind: row.kind,
            message: row.message.clone(),
            subject_id: row.subject_id,
            timestamp: row.created_at,
        });

        self.metrics
            .notifications_published_total
            .with_label_values(&[row.kind.as_label()])
            .inc();
        self.sync_unread_gauge();

        debug!(notification_id = %row.id, kind = ?row.kind, "notification published");
        row
    }

    /// Support pings are externally triggered and rate limited per
    /// originating user. A rejected ping does not re-arm the cooldown.
    pub fn support_ping(&self, user_id: Uuid, message: String) -> Result<Notification, AppError> {
        let now = Utc::now();

        // Lapsed windows are dead weight; drop them so the map stays bounded
        // by the number of users active within one cooldown.
        self.ping_armed_at
            .retain(|_, armed_at| now - *armed_at < self.ping_cooldown);

        match self.ping_armed_at.entry(user_id) {
            Entry::Occupied(mut armed) => {
                let elapsed = now - *armed.get();
                if elapsed < self.ping_cooldown {
                    let retry_after_secs = (self.ping_cooldown - elapsed).num_seconds().max(1);
                    return Err(AppError::RateLimited { retry_after_secs });
                }
                armed.insert(now);
            }
            Entry::Vacant(slot) => {
                slot.insert(now);
            }
        }

        Ok(self.publish(NotificationKind::SupportPing, message, user_id))
    }

    pub fn fetch(&self) -> (Vec<Notification>, Vec<Notification>) {
        self.store.fetch()
    }

    pub fn mark_read(&self, id: Uuid) -> Result<Notification, AppError> {
        let row = self
            .store
            .mark_read(id)
            .ok_or_else(|| AppError::NotFound(format!("notification {id} not found")))?;
        self.sync_unread_gauge();
        Ok(row)
    }

    pub fn mark_all_read(&self) -> usize {
        let flipped = self.store.mark_all_read();
        self.sync_unread_gauge();
        flipped
    }

    pub fn unread_count(&self) -> usize {
        self.store.unread_count()
    }

    pub fn ledger_len(&self) -> usize {
        self.store.len()
    }

    // Set from the ledger rather than incremented, so the gauge cannot drift
    // from the durable rows.
    fn sync_unread_gauge(&self) {
        self.metrics
            .notifications_unread
            .set(self.store.unread_count() as i64);
    }
}

impl NotificationKind {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::NewOrder => "new_order",
            Self::OrderAssigned => "order_assigned",
            Self::OrderDelivered => "order_delivered",
            Self::OrderCanceled => "order_canceled",
            Self::OrderRestored => "order_restored",
            Self::SupportPing => "support_ping",
        }
    }
}
