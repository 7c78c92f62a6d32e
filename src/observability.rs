use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: slot-set computations served.
pub const SLOT_QUERIES_TOTAL: &str = "slotbook_slot_queries_total";

/// Histogram: slot-set computation latency in seconds.
pub const SLOT_QUERY_DURATION_SECONDS: &str = "slotbook_slot_query_duration_seconds";

/// Counter: bookings created.
pub const BOOKINGS_CREATED_TOTAL: &str = "slotbook_bookings_created_total";

/// Counter: creation/reschedule requests whose slot was gone at write time.
pub const BOOKINGS_REJECTED_TOTAL: &str = "slotbook_bookings_rejected_total";

/// Counter: self-service cancellations.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "slotbook_bookings_cancelled_total";

/// Counter: self-service reschedules.
pub const BOOKINGS_RESCHEDULED_TOTAL: &str = "slotbook_bookings_rescheduled_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
