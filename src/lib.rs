//! Aquagate - a model-serving gateway for water potability predictions.
//!
//! Aquagate sits between HTTP clients and an external model registry. At
//! startup it resolves which trained model version is promoted to the
//! configured stage, downloads that artifact, and only then starts
//! accepting prediction traffic. Requests are validated against the nine
//! water quality measurements before the model ever sees them.
//!
//! # Features
//!
//! - **Stage-based resolution**: The highest model version promoted to a
//!   stage wins; artifacts are addressed by training run, never guessed.
//! - **Startup barrier**: Transient registry failures are retried with
//!   exponential backoff; the gateway never serves without a model.
//! - **Strict validation**: Missing, non-numeric, and non-finite feature
//!   values are rejected with the offending field named.
//! - **Operational surface**: Health and readiness probes, Prometheus
//!   metrics, and structured logs.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Aquagate                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  HTTP Layer: / | /predict | /model | /health probes         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Serving: Feature Validation | Prediction Service           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Model: Artifact Decoding | Predictor Cache                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Registry: Version Resolution | Artifact Fetch | Retry      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use aquagate::config::GatewayConfig;
//!
//! #[tokio::main]
//! async fn main() -> aquagate::Result<()> {
//!     // Use development configuration
//!     let config = GatewayConfig::development();
//!
//!     // Start the gateway
//!     aquagate::run(config).await
//! }
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod health;
pub mod model;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod serving;
pub mod shutdown;

// Re-exports
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};

use serving::GatewayState;
use shutdown::{ShutdownCoordinator, SignalHandler};
use std::sync::Arc;
use tracing::{error, info};

/// Run the gateway with the given configuration.
///
/// Resolves and loads the configured model before binding the HTTP
/// server, then serves until a shutdown signal arrives. Returns an
/// error if startup fails; the gateway never accepts traffic without
/// a loaded model.
pub async fn run(config: GatewayConfig) -> Result<()> {
    config.validate()?;

    // Initialize observability
    observability::init(&config.observability)?;

    info!(
        model = %config.model.model_name,
        stage = %config.model.stage,
        experiment = %config.model.experiment,
        registry = %config.model.registry_url,
        "Starting aquagate"
    );

    // Create shutdown coordinator
    let coordinator = ShutdownCoordinator::new();

    // Start metrics server
    let mut metrics_handle = None;
    if config.observability.metrics_enabled {
        info!("Starting metrics server on {}", config.observability.metrics_addr);
        let obs_config = config.observability.clone();

        metrics_handle = Some(tokio::spawn(async move {
            if let Err(e) = observability::run_metrics_server(obs_config).await {
                error!("Metrics server error: {}", e);
            }
        }));
    }

    // Start signal handler in background
    let signal_coordinator = coordinator.clone();
    tokio::spawn(async move {
        SignalHandler::new(signal_coordinator).run().await;
    });

    // Resolve and load the model before accepting any traffic.
    let service = match serving::initialize(&config).await {
        Ok(service) => service,
        Err(err) => {
            if err.is_startup_fatal() {
                error!(error = %err, "Startup aborted before the gateway became ready");
            } else {
                error!(error = %err, "Unexpected startup failure");
            }
            return Err(err);
        }
    };
    let state = GatewayState::ready(Arc::new(service));

    serving::run_gateway_server(config.server.bind_addr, state, coordinator).await?;

    if let Some(handle) = metrics_handle {
        if !handle.is_finished() {
            handle.abort();
        }
    }

    info!("Gateway shutdown complete");
    Ok(())
}
