/// Metrics and telemetry for Bloodlink
///
/// Provides Prometheus-compatible metrics for monitoring:
/// - HTTP request counts and latencies
/// - Login attempts
/// - Stock mutations, event registrations and blood requests

use axum::{
    extract::{MatchedPath, Request},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Instant;

lazy_static! {
    // ========== HTTP Metrics ==========

    /// Total HTTP requests by method, route, and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    /// HTTP request duration in seconds
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latencies in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap();

    /// Active HTTP requests
    pub static ref HTTP_REQUESTS_ACTIVE: IntGauge = register_int_gauge!(
        "http_requests_active",
        "Number of HTTP requests currently being processed"
    )
    .unwrap();

    // ========== Domain Metrics ==========

    /// Login attempts by principal kind and outcome
    pub static ref LOGIN_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "login_attempts_total",
        "Total number of login attempts",
        &["kind", "outcome"]
    )
    .unwrap();

    /// Stock mutations by blood type and operation
    pub static ref STOCK_UPDATES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blood_stock_updates_total",
        "Total number of blood stock updates",
        &["blood_type", "operation"]
    )
    .unwrap();

    /// Event registration attempts by outcome
    pub static ref EVENT_REGISTRATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "event_registrations_total",
        "Total number of event registration attempts",
        &["outcome"]
    )
    .unwrap();

    /// Blood requests created by urgency
    pub static ref BLOOD_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "blood_requests_total",
        "Total number of blood requests created",
        &["urgency"]
    )
    .unwrap();
}

/// Record a login attempt
pub fn record_login(kind: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    LOGIN_ATTEMPTS_TOTAL.with_label_values(&[kind, outcome]).inc();
}

/// Record an event registration attempt
pub fn record_registration(outcome: &str) {
    EVENT_REGISTRATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// HTTP metrics middleware
///
/// Labels by the matched route template so ids do not explode cardinality.
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    HTTP_REQUESTS_ACTIVE.inc();
    let start = Instant::now();

    let response = next.run(request).await;

    HTTP_REQUESTS_ACTIVE.dec();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(start.elapsed().as_secs_f64());
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, response.status().as_str()])
        .inc();

    response
}

/// Render all registered metrics in the Prometheus text format
pub fn gather() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

/// `/metrics` handler
pub async fn metrics_handler() -> Response {
    match gather() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
