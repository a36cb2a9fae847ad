use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub shipment_transitions_total: IntCounterVec,
    pub ledger_transactions_total: IntCounterVec,
    pub command_errors_total: IntCounterVec,
    pub pending_payouts: IntGauge,
    pub command_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let shipment_transitions_total = IntCounterVec::new(
            Opts::new(
                "shipment_transitions_total",
                "Committed shipment transitions by target status",
            ),
            &["to_status"],
        )
        .expect("valid shipment_transitions_total metric");

        let ledger_transactions_total = IntCounterVec::new(
            Opts::new("ledger_transactions_total", "Courier ledger postings by transaction type"),
            &["type"],
        )
        .expect("valid ledger_transactions_total metric");

        let command_errors_total = IntCounterVec::new(
            Opts::new("command_errors_total", "Rejected commands by error kind"),
            &["kind"],
        )
        .expect("valid command_errors_total metric");

        let pending_payouts = IntGauge::new(
            "pending_payouts",
            "Withdrawal requests awaiting processing",
        )
        .expect("valid pending_payouts metric");

        let command_latency_seconds = HistogramVec::new(
            HistogramOpts::new("command_latency_seconds", "Latency of engine commands in seconds"),
            &["command"],
        )
        .expect("valid command_latency_seconds metric");

        registry
            .register(Box::new(shipment_transitions_total.clone()))
            .expect("register shipment_transitions_total");
        registry
            .register(Box::new(ledger_transactions_total.clone()))
            .expect("register ledger_transactions_total");
        registry
            .register(Box::new(command_errors_total.clone()))
            .expect("register command_errors_total");
        registry
            .register(Box::new(pending_payouts.clone()))
            .expect("register pending_payouts");
        registry
            .register(Box::new(command_latency_seconds.clone()))
            .expect("register command_latency_seconds");

        Self {
            registry,
            shipment_transitions_total,
            ledger_transactions_total,
            command_errors_total,
            pending_payouts,
            command_latency_seconds,
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
