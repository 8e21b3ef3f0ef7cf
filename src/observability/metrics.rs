//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): latency by method, service
//!
//! # Design Decisions
//! - Recorded by a middleware wrapping the panic boundary, so every
//!   response is counted, including caught panics
//! - Service label comes from the [`ServiceLabel`] response extension; `none`
//!   when routing failed or the handler panicked
//! - Recording is a no-op until an exporter is installed

use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Service a response was produced for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLabel(pub String);

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "service" => service.to_string()
    )
    .increment(1);

    metrics::histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "service" => service.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Middleware recording every request that passes through it.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let response = next.run(request).await;

    let service = response
        .extensions()
        .get::<ServiceLabel>()
        .map(|label| label.0.as_str())
        .unwrap_or("none");
    record_request(method.as_str(), response.status().as_u16(), service, start);
    response
}
