//! Observability module for the gateway.
//!
//! Provides logging and metrics capabilities.

use crate::config::ObservabilityConfig;
use crate::error::{GatewayError, Result};
use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use ::tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize observability (logging and metrics).
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| GatewayError::Internal(format!("Failed to init logging: {}", e)))?;
    } else {
        subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| GatewayError::Internal(format!("Failed to init logging: {}", e)))?;
    }

    info!("Observability initialized");
    Ok(())
}

/// Run the Prometheus metrics server.
pub async fn run_metrics_server(config: ObservabilityConfig) -> Result<()> {
    let builder = PrometheusBuilder::new();

    let handle = builder
        .install_recorder()
        .map_err(|e| GatewayError::Internal(format!("Failed to install metrics recorder: {}", e)))?;

    // Register some basic metrics
    register_metrics();

    // Start HTTP server for metrics
    let app = axum::Router::new()
        .route("/metrics", axum::routing::get(move || async move {
            handle.render()
        }))
        .route("/health", axum::routing::get(|| async { "OK" }));

    let listener = TcpListener::bind(config.metrics_addr).await?;
    info!(addr = %config.metrics_addr, "Metrics server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| GatewayError::Network(e.to_string()))?;

    Ok(())
}

/// Register standard metrics.
fn register_metrics() {
    // Model metrics
    gauge!("aquagate_model_version").set(0.0);

    // Request metrics
    counter!("aquagate_requests_total").absolute(0);
    counter!("aquagate_request_errors_total").absolute(0);

    // Prediction metrics
    counter!("aquagate_predictions_total").absolute(0);
    counter!("aquagate_validation_failures_total").absolute(0);
    counter!("aquagate_inference_failures_total").absolute(0);
}

/// Record an HTTP request against the gateway.
pub fn record_request(endpoint: &str, status: u16) {
    counter!(
        "aquagate_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string()
    ).increment(1);

    if status >= 400 {
        counter!("aquagate_request_errors_total").increment(1);
    }
}

/// Record a served prediction.
pub fn record_prediction(label: &str) {
    counter!("aquagate_predictions_total", "label" => label.to_string()).increment(1);
}

/// Record a rejected feature payload.
pub fn record_validation_failure(field: &str) {
    counter!("aquagate_validation_failures_total", "field" => field.to_string()).increment(1);
}

/// Record a model scoring failure.
pub fn record_inference_failure() {
    counter!("aquagate_inference_failures_total").increment(1);
}

/// Update the served model version gauge.
pub fn set_model_version(version: u64) {
    gauge!("aquagate_model_version").set(version as f64);
}
