use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub notifications_total: IntCounterVec,
    pub orders_active: IntGauge,
    pub parcels_active: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Committed status transitions by entity"),
            &["entity"],
        )
        .expect("valid transitions_total metric");

        let notifications_total = IntCounterVec::new(
            Opts::new(
                "notifications_total",
                "Notification dispatch attempts by channel and outcome",
            ),
            &["channel", "outcome"],
        )
        .expect("valid notifications_total metric");

        let orders_active = IntGauge::new("orders_active", "Orders not yet delivered")
            .expect("valid orders_active metric");

        let parcels_active = IntGauge::new("parcels_active", "Parcels not yet delivered")
            .expect("valid parcels_active metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(orders_active.clone()))
            .expect("register orders_active");
        registry
            .register(Box::new(parcels_active.clone()))
            .expect("register parcels_active");

        Self {
            registry,
            transitions_total,
            notifications_total,
            orders_active,
            parcels_active,
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
