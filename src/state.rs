use tokio::sync::broadcast;

use crate::models::notification::LifecycleEvent;
use crate::notify::Fanout;
use crate::observability::metrics::Metrics;
use crate::store::drivers::DriverStore;
use crate::store::orders::OrderStore;

pub struct AppState {
    pub orders: OrderStore,
    pub drivers: DriverStore,
    pub fanout: Fanout,
    pub metrics: Metrics,
}

impl AppState {
    /// The broadcast sender is built here and handed to the fan-out
    /// component; nothing in the crate reaches for a process-wide channel.
    pub fn new(event_buffer_size: usize, ping_cooldown_secs: i64) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel::<LifecycleEvent>(event_buffer_size);
        let metrics = Metrics::new();

        Self {
            orders: OrderStore::new(),
            drivers: DriverStore::new(),
            fanout: Fanout::new(events_tx, ping_cooldown_secs, metrics.clone()),
            metrics,
        }
    }
}
