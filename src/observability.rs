use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total HTTP requests served. Labels: method, status.
pub const REQUESTS_TOTAL: &str = "lendit_requests_total";

/// Histogram: request latency in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "lendit_request_duration_seconds";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: booking requests accepted into Waiting.
pub const BOOKINGS_CREATED_TOTAL: &str = "lendit_bookings_created_total";

/// Counter: owner decisions (approve + reject).
pub const BOOKINGS_DECIDED_TOTAL: &str = "lendit_bookings_decided_total";

/// Counter: comments stored.
pub const COMMENTS_TOTAL: &str = "lendit_comments_total";

/// Counter: comments refused by the eligibility gate.
pub const COMMENTS_REJECTED_TOTAL: &str = "lendit_comments_rejected_total";

// ── WAL metrics ─────────────────────────────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "lendit_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "lendit_wal_flush_batch_size";

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
