//! Health check responses for Kubernetes-style probes.
//!
//! The gateway serves three probe routes: `/health` (full component view),
//! `/health/ready` (traffic gate, 503 until the model is loaded), and
//! `/health/live` (process liveness). Handlers build these responses
//! directly from gateway state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Service is healthy.
    Healthy,
    /// Service is degraded but operational.
    Degraded,
    /// Service is unhealthy.
    Unhealthy,
}

impl HealthStatus {
    /// Convert to HTTP status code.
    pub fn to_status_code(&self) -> u16 {
        match self {
            HealthStatus::Healthy => 200,
            HealthStatus::Degraded => 200, // Still operational
            HealthStatus::Unhealthy => 503,
        }
    }

    /// Combine two statuses (worst wins).
    pub fn combine(&self, other: &HealthStatus) -> HealthStatus {
        match (self, other) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

/// Individual component health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name.
    pub name: String,
    /// Health status.
    pub status: HealthStatus,
    /// Optional message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Additional details.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
}

impl ComponentHealth {
    /// Create a healthy component.
    pub fn healthy(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Healthy,
            message: None,
            details: HashMap::new(),
        }
    }

    /// Create an unhealthy component.
    pub fn unhealthy(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            details: HashMap::new(),
        }
    }

    /// Add detail.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Full health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Uptime in seconds.
    pub uptime_seconds: u64,
    /// Individual component checks.
    pub components: Vec<ComponentHealth>,
    /// Timestamp.
    pub timestamp: String,
}

impl HealthResponse {
    /// Create a new health response.
    pub fn new(version: impl Into<String>, start_time: Instant) -> Self {
        Self {
            status: HealthStatus::Healthy,
            version: version.into(),
            uptime_seconds: start_time.elapsed().as_secs(),
            components: Vec::new(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Add a component check.
    pub fn add_component(&mut self, component: ComponentHealth) {
        self.status = self.status.combine(&component.status);
        self.components.push(component);
    }
}

/// Readiness check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether the service is ready to accept traffic.
    pub ready: bool,
    /// Reason if not ready.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Dependencies status.
    pub dependencies: Vec<DependencyStatus>,
}

impl ReadinessResponse {
    /// Create a ready response.
    pub fn ready() -> Self {
        Self {
            ready: true,
            reason: None,
            dependencies: Vec::new(),
        }
    }

    /// Create a not-ready response.
    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            ready: false,
            reason: Some(reason.into()),
            dependencies: Vec::new(),
        }
    }

    /// Add dependency status.
    pub fn with_dependency(mut self, dep: DependencyStatus) -> Self {
        if !dep.available {
            self.ready = false;
            if self.reason.is_none() {
                self.reason = Some(format!("Dependency '{}' unavailable", dep.name));
            }
        }
        self.dependencies.push(dep);
        self
    }
}

/// Dependency status for readiness checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyStatus {
    /// Dependency name.
    pub name: String,
    /// Whether it's available.
    pub available: bool,
    /// Optional error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Latency to check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl DependencyStatus {
    /// Create an available dependency.
    pub fn available(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: true,
            error: None,
            latency_ms: None,
        }
    }

    /// Create an unavailable dependency.
    pub fn unavailable(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: false,
            error: Some(error.into()),
            latency_ms: None,
        }
    }

    /// Add latency.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_ms = Some(latency.as_millis() as u64);
        self
    }
}

/// Liveness check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    /// Whether the service is alive.
    pub alive: bool,
    /// Reason if not alive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl LivenessResponse {
    /// Create an alive response.
    pub fn alive() -> Self {
        Self {
            alive: true,
            reason: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_combine() {
        assert_eq!(
            HealthStatus::Healthy.combine(&HealthStatus::Healthy),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::Healthy.combine(&HealthStatus::Degraded),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::Degraded.combine(&HealthStatus::Unhealthy),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_health_status_to_code() {
        assert_eq!(HealthStatus::Healthy.to_status_code(), 200);
        assert_eq!(HealthStatus::Degraded.to_status_code(), 200);
        assert_eq!(HealthStatus::Unhealthy.to_status_code(), 503);
    }

    #[test]
    fn test_component_health_builders() {
        let healthy = ComponentHealth::healthy("model").with_detail("version", "3");
        assert_eq!(healthy.status, HealthStatus::Healthy);
        assert_eq!(healthy.details.get("version"), Some(&"3".to_string()));

        let unhealthy = ComponentHealth::unhealthy("model", "not loaded");
        assert_eq!(unhealthy.status, HealthStatus::Unhealthy);
        assert_eq!(unhealthy.message, Some("not loaded".to_string()));
    }

    #[test]
    fn test_health_response_worst_component_wins() {
        let start = Instant::now();
        let mut response = HealthResponse::new("0.1.0", start);

        response.add_component(ComponentHealth::healthy("registry"));
        response.add_component(ComponentHealth::unhealthy("model", "not loaded"));

        assert_eq!(response.status, HealthStatus::Unhealthy);
        assert_eq!(response.components.len(), 2);
    }

    #[test]
    fn test_readiness_response() {
        let response = ReadinessResponse::ready()
            .with_dependency(DependencyStatus::available("model"))
            .with_dependency(DependencyStatus::unavailable("registry", "connection refused"));

        assert!(!response.ready);
        assert!(response.reason.is_some());
        assert_eq!(response.dependencies.len(), 2);
    }

    #[test]
    fn test_readiness_serializes_without_empty_reason() {
        let json = serde_json::to_string(&ReadinessResponse::ready()).unwrap();
        assert!(!json.contains("reason"));

        let json = serde_json::to_string(&ReadinessResponse::not_ready("model not loaded")).unwrap();
        assert!(json.contains("model not loaded"));
    }

    #[test]
    fn test_liveness_response() {
        let alive = LivenessResponse::alive();
        assert!(alive.alive);
        assert!(alive.reason.is_none());
    }
}
