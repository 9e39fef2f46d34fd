//! Metrics collection and exposition.

use std::net::SocketAddr;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize metrics exporter and server.
pub fn init_metrics(addr: SocketAddr) {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus recorder");

    tracing::info!("Metrics server listening on http://{}", addr);
}

/// Record a completed request (proxied or gateway-served).
pub fn record_request(method: &str, status: u16, started: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];

    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels)
        .record(started.elapsed().as_secs_f64());
}

/// Middleware that records every response, including pipeline rejections.
pub async fn track_requests(req: Request, next: Next) -> Response {
    let method = req.method().as_str().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    record_request(&method, response.status().as_u16(), started);
    response
}

pub fn record_analytics_enqueued(queue_depth: usize) {
    counter!("gateway_analytics_enqueued_total").increment(1);
    gauge!("gateway_analytics_queue_depth").set(queue_depth as f64);
}

pub fn record_analytics_dropped() {
    counter!("gateway_analytics_dropped_total").increment(1);
}

pub fn record_analytics_written() {
    counter!("gateway_analytics_records_written_total").increment(1);
}

pub fn record_analytics_failed() {
    counter!("gateway_analytics_failures_total").increment(1);
}
