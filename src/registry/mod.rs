//! Client library for communicating with the model registry.
//!
//! The registry is an external system of record mapping (model name, stage)
//! to versioned artifact references. This client covers the three calls the
//! gateway needs: version search, artifact download, and a liveness probe.

pub mod locator;

pub use locator::ArtifactLocator;

use crate::config::{ModelConfig, NetworkConfig, RegistryCredentials};
use crate::error::{GatewayError, Result};
use crate::model::Stage;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default connection timeout for registry requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout for registry operations.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for communicating with the model registry.
///
/// Debug output goes through the credentials' redacting impl, so the
/// client is safe to log.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: String,
    client: Client,
    credentials: Option<RegistryCredentials>,
    request_timeout: Duration,
}

impl RegistryClient {
    /// Create a new registry client with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeouts(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a new registry client with custom timeouts.
    pub fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            credentials: None,
            request_timeout,
        }
    }

    /// Create a client from the gateway configuration.
    pub fn from_config(model: &ModelConfig, network: &NetworkConfig) -> Self {
        let client = Self::with_timeouts(
            &model.registry_url,
            network.connect_timeout,
            network.request_timeout,
        );
        match &model.credentials {
            Some(credentials) => client.with_credentials(credentials.clone()),
            None => client,
        }
    }

    /// Attach basic-auth credentials to every request.
    pub fn with_credentials(mut self, credentials: RegistryCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(creds) => builder.basic_auth(&creds.username, Some(&creds.password)),
            None => builder,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.request_timeout.as_millis() as u64)
        } else {
            GatewayError::RegistryUnavailable(e.to_string())
        }
    }

    /// Check registry health.
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        Ok(response.status().is_success())
    }

    /// List all versions of a model in the given stage.
    pub async fn search_versions(&self, name: &str, stage: Stage) -> Result<Vec<ModelVersionInfo>> {
        let url = format!("{}/api/2.0/registry/model-versions/search", self.base_url);
        let request = SearchVersionsRequest {
            name: name.to_string(),
            stage,
        };

        let response = self
            .authorize(self.client.post(&url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(GatewayError::RegistryUnavailable(format!(
                "Version search returned {}",
                response.status()
            )));
        }

        let result: SearchVersionsResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Deserialization(e.to_string()))?;

        Ok(result.model_versions)
    }

    /// Download the artifact produced by a training run.
    ///
    /// Artifacts are addressed by run id plus artifact path. Version numbers
    /// are registry bookkeeping and never appear in artifact addresses.
    pub async fn fetch_artifact(&self, run_id: &str, path: &str) -> Result<Vec<u8>> {
        let url = format!("{}/api/2.0/registry/artifacts/get", self.base_url);
        let response = self
            .authorize(self.client.get(&url))
            .query(&[("run_id", run_id), ("path", path)])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::ModelLoadFailed(format!(
                "Artifact '{}' not found for run {}",
                path, run_id
            )));
        }
        if !response.status().is_success() {
            return Err(GatewayError::RegistryUnavailable(format!(
                "Artifact fetch returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

// Request/response types

#[derive(Debug, Serialize)]
struct SearchVersionsRequest {
    name: String,
    stage: Stage,
}

#[derive(Debug, Deserialize)]
struct SearchVersionsResponse {
    #[serde(default)]
    model_versions: Vec<ModelVersionInfo>,
}

/// One registered model version as reported by the registry.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelVersionInfo {
    /// Model name.
    pub name: String,
    /// Version number.
    pub version: u64,
    /// Stage the version currently holds.
    pub current_stage: Stage,
    /// Training run that produced the version.
    pub run_id: String,
}
