//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{Counter, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("upload_gateway_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "upload_gateway_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref UPLOADS_TOTAL: IntCounter = IntCounter::new(
        "upload_gateway_uploads_total",
        "Total number of files uploaded"
    ).expect("metric can be created");
    pub static ref UPLOAD_BYTES_TOTAL: Counter = Counter::new(
        "upload_gateway_upload_bytes_total",
        "Total bytes uploaded to the bucket"
    ).expect("metric can be created");
    pub static ref STORAGE_OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("upload_gateway_storage_operations_total", "Total number of bucket operations"),
        &["operation", "outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("upload_gateway_errors_total", "Total number of errors returned to clients"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Must run once per process; a second call panics on duplicate registration.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(UPLOADS_TOTAL.clone()))
        .expect("UPLOADS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(UPLOAD_BYTES_TOTAL.clone()))
        .expect("UPLOAD_BYTES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STORAGE_OPERATIONS_TOTAL.clone()))
        .expect("STORAGE_OPERATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}
