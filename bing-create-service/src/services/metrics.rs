use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

use crate::services::bing::BingError;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static BING_GENERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static BING_POLL_ITERATIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

pub fn init_metrics() {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    if METRICS_HANDLE.set(handle).is_err() {
        panic!("failed to set metrics handle: already initialized");
    }

    let registry = Registry::new();

    let generations = IntCounterVec::new(
        Opts::new(
            "bing_generations_total",
            "Generation requests by kind and outcome",
        ),
        &["kind", "outcome"],
    )
    .expect("Failed to create bing_generations_total metric");

    let polls = IntCounterVec::new(
        Opts::new(
            "bing_poll_iterations_total",
            "Result page fetches by generation kind",
        ),
        &["kind"],
    )
    .expect("Failed to create bing_poll_iterations_total metric");

    registry
        .register(Box::new(generations.clone()))
        .expect("Failed to register bing_generations_total");
    registry
        .register(Box::new(polls.clone()))
        .expect("Failed to register bing_poll_iterations_total");

    PROMETHEUS_REGISTRY
        .set(registry)
        .expect("Failed to set prometheus registry");
    BING_GENERATIONS_TOTAL
        .set(generations)
        .expect("Failed to set bing_generations_total");
    BING_POLL_ITERATIONS_TOTAL
        .set(polls)
        .expect("Failed to set bing_poll_iterations_total");
}

pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&registry.gather(), &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// Count a finished generation. `outcome` is `ok`, `rejected`, `auth`,
/// `invalid`, `timeout` or `error`.
pub fn record_generation(kind: &str, outcome: &str) {
    if let Some(counter) = BING_GENERATIONS_TOTAL.get() {
        counter.with_label_values(&[kind, outcome]).inc();
    }
}

pub fn record_poll(kind: &str) {
    if let Some(counter) = BING_POLL_ITERATIONS_TOTAL.get() {
        counter.with_label_values(&[kind]).inc();
    }
}

/// Outcome label for a finished generation; `None` means success.
pub fn outcome_label(error: Option<&BingError>) -> &'static str {
    match error {
        None => "ok",
        Some(BingError::PromptRejected) => "rejected",
        Some(BingError::AuthCookie(_)) => "auth",
        Some(e) if e.is_validation() => "invalid",
        Some(BingError::PollLimitExceeded { .. }) => "timeout",
        Some(_) => "error",
    }
}
