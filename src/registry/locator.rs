//! Resolution of (model name, stage) to a concrete artifact reference.

use super::{ModelVersionInfo, RegistryClient};
use crate::error::{GatewayError, Result};
use crate::model::{ModelReference, Stage};
use tracing::debug;

/// Resolves the current model version for a stage.
///
/// Read-only: resolution never mutates registry state.
#[derive(Clone)]
pub struct ArtifactLocator {
    client: RegistryClient,
}

impl ArtifactLocator {
    /// Create a locator backed by a registry client.
    pub fn new(client: RegistryClient) -> Self {
        Self { client }
    }

    /// Resolve the highest version of `model_name` staged in `stage`.
    ///
    /// Zero matching versions is a hard failure: a missing promotion must
    /// stop startup rather than silently serving nothing.
    pub async fn resolve(&self, model_name: &str, stage: Stage) -> Result<ModelReference> {
        let versions = self.client.search_versions(model_name, stage).await?;
        debug!(
            model = %model_name,
            stage = %stage,
            candidates = versions.len(),
            "Registry returned version candidates"
        );
        select_version(model_name, stage, versions)
    }
}

/// Pick the winning version from registry candidates.
///
/// The highest version number wins, treated as most recently promoted. On
/// duplicate version numbers the last maximal entry of the response is kept,
/// which is deterministic for identical registry state.
pub(crate) fn select_version(
    model_name: &str,
    stage: Stage,
    versions: Vec<ModelVersionInfo>,
) -> Result<ModelReference> {
    versions
        .into_iter()
        .filter(|v| v.current_stage == stage)
        .max_by_key(|v| v.version)
        .map(|v| ModelReference {
            model_name: model_name.to_string(),
            stage,
            version: v.version,
            run_id: v.run_id,
        })
        .ok_or_else(|| GatewayError::NoStagedVersion {
            model_name: model_name.to_string(),
            stage,
        })
}
