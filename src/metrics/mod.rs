//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Intent intake and cancellation
//! - Chain discovery outcomes, lengths and latency
//! - Settlement commits and rejections
//! - Store health

use crate::error::{ServiceError, ServiceResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Intent metrics
    pub static ref INTENTS: CounterVec = register_counter_vec!(
        "intent_settlement_intents_total",
        "Intents by lifecycle event",
        &["event"]
    ).expect("register intents counter");

    // Discovery metrics
    pub static ref CHAIN_SEARCHES: CounterVec = register_counter_vec!(
        "intent_settlement_chain_searches_total",
        "Chain searches by outcome",
        &["outcome"]
    ).expect("register chain search counter");

    pub static ref CHAIN_LENGTH: HistogramVec = register_histogram_vec!(
        "intent_settlement_chain_length",
        "Number of intents in discovered chains",
        &[],
        vec![2.0, 3.0, 4.0, 5.0, 6.0, 8.0, 12.0]
    ).expect("register chain length histogram");

    pub static ref SEARCH_LATENCY: HistogramVec = register_histogram_vec!(
        "intent_settlement_search_latency_seconds",
        "Chain search latency",
        &[],
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]
    ).expect("register search latency histogram");

    // Settlement metrics
    pub static ref SETTLEMENTS: CounterVec = register_counter_vec!(
        "intent_settlement_settlements_total",
        "Settlement attempts by outcome",
        &["outcome"]
    ).expect("register settlement counter");

    // Health metrics
    pub static ref HEALTH_CHECKS: CounterVec = register_counter_vec!(
        "intent_settlement_health_checks_total",
        "Store health checks by result",
        &["result"]
    ).expect("register health check counter");
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> ServiceResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    render().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Render all registered metrics in the text exposition format
pub fn render() -> ServiceResult<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ServiceError::Internal(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| ServiceError::Internal(e.to_string()))
}

// Helper functions to record metrics

pub fn record_intent_created() {
    INTENTS.with_label_values(&["created"]).inc();
}

pub fn record_intent_cancelled() {
    INTENTS.with_label_values(&["cancelled"]).inc();
}

pub fn record_chain_found(len: usize, latency_secs: f64) {
    CHAIN_SEARCHES.with_label_values(&["found"]).inc();
    CHAIN_LENGTH.with_label_values(&[]).observe(len as f64);
    SEARCH_LATENCY.with_label_values(&[]).observe(latency_secs);
}

pub fn record_chain_not_found(latency_secs: f64) {
    CHAIN_SEARCHES.with_label_values(&["not_found"]).inc();
    SEARCH_LATENCY.with_label_values(&[]).observe(latency_secs);
}

pub fn record_settlement_committed() {
    SETTLEMENTS.with_label_values(&["committed"]).inc();
}

pub fn record_settlement_rejected() {
    SETTLEMENTS.with_label_values(&["rejected"]).inc();
}

pub fn record_health_check() {
    HEALTH_CHECKS.with_label_values(&["ok"]).inc();
}

pub fn record_health_check_failure() {
    HEALTH_CHECKS.with_label_values(&["failed"]).inc();
}
