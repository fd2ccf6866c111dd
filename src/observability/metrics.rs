use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub assignment_conflicts_total: IntCounter,
    pub reassignments_total: IntCounter,
    pub notifications_published_total: IntCounterVec,
    pub notifications_unread: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Order status transitions by target and outcome"),
            &["target", "outcome"],
        )
        .expect("valid transitions_total metric");

        let assignment_conflicts_total = IntCounter::new(
            "assignment_conflicts_total",
            "Driver assignments lost to a concurrent writer",
        )
        .expect("valid assignment_conflicts_total metric");

        let reassignments_total = IntCounter::new(
            "reassignments_total",
            "Driver swaps on orders already in transit",
        )
        .expect("valid reassignments_total metric");

        let notifications_published_total = IntCounterVec::new(
            Opts::new("notifications_published_total", "Published operator notifications by kind"),
            &["kind"],
        )
        .expect("valid notifications_published_total metric");

        let notifications_unread =
            IntGauge::new("notifications_unread", "Unread rows in the notification ledger")
                .expect("valid notifications_unread metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(assignment_conflicts_total.clone()))
            .expect("register assignment_conflicts_total");
        registry
            .register(Box::new(reassignments_total.clone()))
            .expect("register reassignments_total");
        registry
            .register(Box::new(notifications_published_total.clone()))
            .expect("register notifications_published_total");
        registry
            .register(Box::new(notifications_unread.clone()))
            .expect("register notifications_unread");

        Self {
            registry,
            transitions_total,
            assignment_conflicts_total,
            reassignments_total,
            notifications_published_total,
            notifications_unread,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
