//! Artifact loading and predictor caching.

use super::{decode_artifact, ModelReference, Predictor};
use crate::error::Result;
use crate::registry::RegistryClient;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

/// Loads artifacts into invocable predictors, at most once per reference.
///
/// The cache is keyed by the full [`ModelReference`] and lives for the
/// process lifetime. A reference resolved at startup is therefore fetched
/// exactly once, no matter how often `load` is called for it.
pub struct ModelLoader {
    client: RegistryClient,
    cache: Mutex<HashMap<ModelReference, Arc<dyn Predictor>>>,
    // Serializes fetches so concurrent first loads cannot download twice.
    fetch_gate: AsyncMutex<()>,
}

impl ModelLoader {
    /// Create a loader backed by a registry client.
    pub fn new(client: RegistryClient) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
            fetch_gate: AsyncMutex::new(()),
        }
    }

    /// Materialize the predictor for a resolved reference.
    ///
    /// Fetches the artifact addressed by `run_id` plus model name, decodes
    /// it, and caches the result. Subsequent calls with an identical
    /// reference return the cached instance without touching the registry.
    pub async fn load(&self, reference: &ModelReference) -> Result<Arc<dyn Predictor>> {
        {
            let cache = self.cache.lock();
            if let Some(predictor) = cache.get(reference) {
                return Ok(Arc::clone(predictor));
            }
        }

        let _gate = self.fetch_gate.lock().await;
        {
            // A concurrent load may have populated the cache while we
            // waited on the gate.
            let cache = self.cache.lock();
            if let Some(predictor) = cache.get(reference) {
                return Ok(Arc::clone(predictor));
            }
        }

        let bytes = self
            .client
            .fetch_artifact(&reference.run_id, &reference.model_name)
            .await?;
        let predictor = decode_artifact(&bytes)?;
        info!(
            model = %reference.model_name,
            version = reference.version,
            run_id = %reference.run_id,
            bytes = bytes.len(),
            "Model artifact loaded"
        );

        self.cache
            .lock()
            .insert(reference.clone(), Arc::clone(&predictor));
        Ok(predictor)
    }

    /// Number of distinct references loaded so far.
    pub fn cached_count(&self) -> usize {
        self.cache.lock().len()
    }
}
