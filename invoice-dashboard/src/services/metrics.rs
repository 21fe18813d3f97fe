use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

// Global registry
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

// Metrics
pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();
pub static INVOICE_FETCH_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static SIGN_IN_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Create and register the collectors. Recording before this is a no-op.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let registry = Registry::new();

    let requests_total = IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests"),
        &["method", "path", "status"],
    )?;

    let request_duration = HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request duration in seconds",
        ),
        &["method", "path", "status"],
    )?;

    let invoice_fetch_total = IntCounterVec::new(
        Opts::new(
            "invoice_fetch_total",
            "Invoice API fetches by outcome (one per dashboard mount)",
        ),
        &["outcome"],
    )?;

    let sign_in_total = IntCounterVec::new(
        Opts::new("sign_in_total", "Completed interactive sign-ins by outcome"),
        &["outcome"],
    )?;

    registry.register(Box::new(requests_total.clone()))?;
    registry.register(Box::new(request_duration.clone()))?;
    registry.register(Box::new(invoice_fetch_total.clone()))?;
    registry.register(Box::new(sign_in_total.clone()))?;

    // Initialize globals
    let _ = REGISTRY.set(registry);
    let _ = HTTP_REQUESTS_TOTAL.set(requests_total);
    let _ = HTTP_REQUEST_DURATION_SECONDS.set(request_duration);
    let _ = INVOICE_FETCH_TOTAL.set(invoice_fetch_total);
    let _ = SIGN_IN_TOTAL.set(sign_in_total);

    Ok(())
}

pub fn record_http_request(method: &str, path: &str, status: &str, seconds: f64) {
    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        counter.with_label_values(&[method, path, status]).inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION_SECONDS.get() {
        histogram
            .with_label_values(&[method, path, status])
            .observe(seconds);
    }
}

pub fn record_invoice_fetch(outcome: &str) {
    if let Some(counter) = INVOICE_FETCH_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_sign_in(outcome: &str) {
    if let Some(counter) = SIGN_IN_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

/// Prometheus text exposition of the registry; empty before `init_metrics`.
pub fn get_metrics() -> anyhow::Result<String> {
    let Some(registry) = REGISTRY.get() else {
        return Ok(String::new());
    };

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
