use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transitions_total: IntCounterVec,
    pub claims_total: IntCounterVec,
    pub claim_latency_seconds: HistogramVec,
    pub location_samples_total: IntCounter,
    pub location_reads_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transitions_total = IntCounterVec::new(
            Opts::new("transitions_total", "Order status transitions by outcome"),
            &["outcome"],
        )
        .expect("valid transitions_total metric");

        let claims_total = IntCounterVec::new(
            Opts::new("claims_total", "Claim attempts by outcome"),
            &["outcome"],
        )
        .expect("valid claims_total metric");

        let claim_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "claim_latency_seconds",
                "Latency of claim processing in seconds",
            ),
            &["outcome"],
        )
        .expect("valid claim_latency_seconds metric");

        let location_samples_total = IntCounter::new(
            "location_samples_total",
            "Courier location samples ingested",
        )
        .expect("valid location_samples_total metric");

        let location_reads_total = IntCounterVec::new(
            Opts::new("location_reads_total", "Location reads by source"),
            &["source"],
        )
        .expect("valid location_reads_total metric");

        registry
            .register(Box::new(transitions_total.clone()))
            .expect("register transitions_total");
        registry
            .register(Box::new(claims_total.clone()))
            .expect("register claims_total");
        registry
            .register(Box::new(claim_latency_seconds.clone()))
            .expect("register claim_latency_seconds");
        registry
            .register(Box::new(location_samples_total.clone()))
            .expect("register location_samples_total");
        registry
            .register(Box::new(location_reads_total.clone()))
            .expect("register location_reads_total");

        Self {
            registry,
            transitions_total,
            claims_total,
            claim_latency_seconds,
            location_samples_total,
            location_reads_total,
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
