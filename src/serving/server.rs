//! HTTP gateway server for prediction requests.

use super::{Potability, PredictionService};
use crate::error::{GatewayError, Result};
use crate::health::{
    ComponentHealth, DependencyStatus, HealthResponse, LivenessResponse, ReadinessResponse,
};
use crate::model::Stage;
use crate::observability;
use crate::shutdown::ShutdownCoordinator;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Greeting served at the root route.
const WELCOME: &str =
    "Water potability prediction service. POST the nine feature measurements to /predict.";

/// Shared state for gateway handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// Loaded prediction service. `None` means startup has not completed.
    service: Option<Arc<PredictionService>>,
    /// Process start time for uptime reporting.
    started_at: Instant,
}

impl GatewayState {
    /// State for a gateway whose model finished loading.
    pub fn ready(service: Arc<PredictionService>) -> Self {
        Self {
            service: Some(service),
            started_at: Instant::now(),
        }
    }

    /// State for a gateway without a loaded model. Prediction requests
    /// are refused until a ready state replaces this one.
    pub fn not_ready() -> Self {
        Self {
            service: None,
            started_at: Instant::now(),
        }
    }
}

/// Build the gateway router.
pub fn gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/predict", post(handle_predict))
        .route("/model", get(model_info))
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Run the gateway HTTP server until shutdown is signalled.
///
/// Draining is bounded by the coordinator's timeout: connections still
/// open past the deadline are dropped so the process exits before the
/// supervisor's kill grace expires.
pub async fn run_gateway_server(
    bind_addr: SocketAddr,
    state: GatewayState,
    coordinator: ShutdownCoordinator,
) -> Result<()> {
    let app = gateway_router(state);

    let listener = TcpListener::bind(bind_addr).await?;
    info!(addr = %bind_addr, "Gateway listening");

    let shutdown = coordinator.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.wait_for_shutdown().await });

    tokio::select! {
        result = server => {
            result.map_err(|e| GatewayError::Network(e.to_string()))?;
        }
        _ = async {
            coordinator.wait_for_shutdown().await;
            tokio::time::sleep(coordinator.timeout()).await;
        } => {
            warn!(timeout = ?coordinator.timeout(), "Drain deadline exceeded, dropping open connections");
        }
    }

    Ok(())
}

/// Request tracking middleware.
async fn track_requests(req: Request, next: Next) -> Response {
    let endpoint = req.uri().path().to_string();
    let response = next.run(req).await;
    observability::record_request(&endpoint, response.status().as_u16());
    response
}

async fn index() -> &'static str {
    WELCOME
}

/// Handle `POST /predict`.
async fn handle_predict(
    State(state): State<GatewayState>,
    Json(payload): Json<serde_json::Value>,
) -> Response {
    let Some(service) = state.service.as_ref() else {
        warn!("Prediction requested before model finished loading");
        return error_response(&GatewayError::ServiceNotReady);
    };

    match service.predict(&payload) {
        Ok(verdict) => {
            observability::record_prediction(verdict.as_str());
            Json(PredictResponse {
                potability: verdict,
            })
            .into_response()
        }
        Err(err) => {
            match &err {
                GatewayError::Validation { field, .. } => {
                    observability::record_validation_failure(field);
                }
                GatewayError::InferenceFailed(_) => {
                    observability::record_inference_failure();
                }
                _ => {}
            }
            error_response(&err)
        }
    }
}

/// Handle `GET /model`.
async fn model_info(State(state): State<GatewayState>) -> Response {
    match state.service.as_ref() {
        Some(service) => {
            let reference = service.reference();
            Json(ModelInfoResponse {
                model_name: reference.model_name.clone(),
                stage: reference.stage,
                version: reference.version,
                run_id: reference.run_id.clone(),
            })
            .into_response()
        }
        None => error_response(&GatewayError::ServiceNotReady),
    }
}

/// Handle `GET /health`.
async fn health_check(State(state): State<GatewayState>) -> Response {
    let mut response = HealthResponse::new(env!("CARGO_PKG_VERSION"), state.started_at);

    match state.service.as_ref() {
        Some(service) => {
            let reference = service.reference();
            response.add_component(
                ComponentHealth::healthy("model")
                    .with_detail("version", reference.version.to_string())
                    .with_detail("run_id", reference.run_id.clone()),
            );
        }
        None => {
            response.add_component(ComponentHealth::unhealthy("model", "Model not loaded"));
        }
    }

    let status = StatusCode::from_u16(response.status.to_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response)).into_response()
}

/// Handle `GET /health/live`.
async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse::alive())
}

/// Handle `GET /health/ready`.
///
/// Readiness is gated on the model alone. The registry is probed and
/// reported as a dependency, but a registry outage does not un-ready a
/// gateway that already holds its model.
async fn readiness(State(state): State<GatewayState>) -> Response {
    match state.service.as_ref() {
        Some(service) => {
            let probe = Instant::now();
            let registry = match service.registry().health().await {
                Ok(true) => DependencyStatus::available("registry").with_latency(probe.elapsed()),
                Ok(false) => DependencyStatus::unavailable("registry", "Health probe failed"),
                Err(err) => DependencyStatus::unavailable("registry", err.to_string()),
            };

            let mut response =
                ReadinessResponse::ready().with_dependency(DependencyStatus::available("model"));
            // Advisory only: a loaded model keeps serving through registry
            // outages, so this entry must not demote `ready`.
            response.dependencies.push(registry);
            Json(response).into_response()
        }
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse::not_ready("Model not loaded")),
        )
            .into_response(),
    }
}

/// Map an error to its HTTP response.
///
/// Validation failures carry the offending field back to the caller.
/// Everything else is reported generically: upstream error text can
/// embed registry details and must stay in the server logs.
fn error_response(err: &GatewayError) -> Response {
    match err {
        GatewayError::Validation { field, reason } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorBody {
                error: "validation_error",
                field: Some(field.clone()),
                message: format!("Invalid value for '{}': {}", field, reason),
            }),
        )
            .into_response(),
        GatewayError::ServiceNotReady => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                error: "service_not_ready",
                field: None,
                message: "Model is not loaded yet".to_string(),
            }),
        )
            .into_response(),
        other => {
            error!(error = %other, "Prediction request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "internal_error",
                    field: None,
                    message: "Internal server error".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Response body for `POST /predict`.
#[derive(Debug, Serialize)]
struct PredictResponse {
    potability: Potability,
}

/// Response body for `GET /model`.
#[derive(Debug, Serialize)]
struct ModelInfoResponse {
    model_name: String,
    stage: Stage,
    version: u64,
    run_id: String,
}

/// Error body returned to clients.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
    message: String,
}
