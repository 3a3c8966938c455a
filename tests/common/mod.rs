//! Common test utilities for integration tests.

use aquagate::features::FEATURE_FIELDS;
use aquagate::serving::{gateway_router, GatewayState};
use aquagate::GatewayConfig;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// In-process stand-in for the external model registry.
///
/// Serves the version search and artifact download routes the gateway
/// talks to, and counts how often each is hit.
pub struct MockRegistry {
    addr: SocketAddr,
    /// Number of version search requests received.
    pub search_calls: Arc<AtomicUsize>,
    /// Number of artifact downloads served.
    pub artifact_fetches: Arc<AtomicUsize>,
    /// Run IDs requested on the artifact route, in order.
    pub requested_run_ids: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

#[derive(Clone)]
struct MockState {
    versions: Arc<Vec<Value>>,
    artifact: Arc<Value>,
    search_calls: Arc<AtomicUsize>,
    artifact_fetches: Arc<AtomicUsize>,
    requested_run_ids: Arc<Mutex<Vec<String>>>,
    failing_searches: Arc<AtomicUsize>,
}

impl MockRegistry {
    /// Start a registry serving `versions` as `(version, stage, run_id)`
    /// tuples and `artifact` as every artifact download.
    pub async fn start(versions: Vec<(u64, &str, &str)>, artifact: Value) -> Self {
        Self::start_flaky(0, versions, artifact).await
    }

    /// Same as [`MockRegistry::start`], but the first `failing_searches`
    /// version searches answer with a 500 before the registry recovers.
    pub async fn start_flaky(
        failing_searches: usize,
        versions: Vec<(u64, &str, &str)>,
        artifact: Value,
    ) -> Self {
        let versions: Vec<Value> = versions
            .into_iter()
            .map(|(version, stage, run_id)| {
                json!({
                    "name": "water-potability",
                    "version": version,
                    "current_stage": stage,
                    "run_id": run_id,
                })
            })
            .collect();

        let state = MockState {
            versions: Arc::new(versions),
            artifact: Arc::new(artifact),
            search_calls: Arc::new(AtomicUsize::new(0)),
            artifact_fetches: Arc::new(AtomicUsize::new(0)),
            requested_run_ids: Arc::new(Mutex::new(Vec::new())),
            failing_searches: Arc::new(AtomicUsize::new(failing_searches)),
        };

        let search_calls = Arc::clone(&state.search_calls);
        let artifact_fetches = Arc::clone(&state.artifact_fetches);
        let requested_run_ids = Arc::clone(&state.requested_run_ids);

        let app = Router::new()
            .route(
                "/api/2.0/registry/model-versions/search",
                post(search_versions),
            )
            .route("/api/2.0/registry/artifacts/get", get(fetch_artifact))
            .route("/health", get(|| async { "OK" }))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock registry");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            search_calls,
            artifact_fetches,
            requested_run_ids,
            handle,
        }
    }

    /// Base URL for pointing a gateway at this registry.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for MockRegistry {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn search_versions(State(state): State<MockState>) -> Response {
    state.search_calls.fetch_add(1, Ordering::SeqCst);

    if state.failing_searches.load(Ordering::SeqCst) > 0 {
        state.failing_searches.fetch_sub(1, Ordering::SeqCst);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    Json(json!({ "model_versions": *state.versions })).into_response()
}

async fn fetch_artifact(
    State(state): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    state.artifact_fetches.fetch_add(1, Ordering::SeqCst);

    if let Some(run_id) = params.get("run_id") {
        state.requested_run_ids.lock().unwrap().push(run_id.clone());
    }

    Json((*state.artifact).clone()).into_response()
}

/// Gateway configuration pointed at a mock registry.
pub fn test_config(registry_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::development();
    config.model.registry_url = registry_url.to_string();
    config
}

/// Logistic artifact with zero weights: the verdict depends only on the
/// intercept, so a large positive value forces class 1 and a large
/// negative value forces class 0.
pub fn linear_artifact(intercept: f64) -> Value {
    let coefficients: serde_json::Map<String, Value> = FEATURE_FIELDS
        .iter()
        .map(|field| (field.to_string(), json!(0.0)))
        .collect();

    json!({
        "format": "linear",
        "intercept": intercept,
        "coefficients": coefficients,
        "threshold": 0.5,
    })
}

/// A complete, valid feature payload.
pub fn sample_features() -> Value {
    json!({
        "ph": 7.0,
        "Hardness": 150.0,
        "Solids": 10000.0,
        "Chloramines": 5.0,
        "Sulfate": 250.0,
        "Conductivity": 400.0,
        "Organic_carbon": 10.0,
        "Trihalomethanes": 60.0,
        "Turbidity": 4.0,
    })
}

/// Serve a gateway router on an ephemeral port.
pub async fn spawn_gateway(state: GatewayState) -> (SocketAddr, JoinHandle<()>) {
    let app = gateway_router(state);
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind gateway");
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, handle)
}
