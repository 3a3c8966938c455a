//! Prediction serving: the loaded model behind the HTTP surface.
//!
//! [`initialize`] runs the startup barrier (resolve the staged version,
//! fetch and decode its artifact, with bounded retries) and produces a
//! [`PredictionService`]. The service itself is synchronous: validation
//! and scoring are pure CPU work on an already-loaded model, and a
//! request never triggers a registry call.

pub mod server;

pub use server::{gateway_router, run_gateway_server, GatewayState};

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::features::FeatureRecord;
use crate::model::{ModelLoader, ModelReference, Predictor};
use crate::observability;
use crate::registry::{ArtifactLocator, RegistryClient};
use crate::resilience::{RetryConfig, RetryExecutor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Verdict for a water sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Potability {
    /// Class 1: safe to drink.
    Potable,
    /// Any other class: not safe to drink.
    #[serde(rename = "Not Potable")]
    NotPotable,
}

impl Potability {
    /// Human-readable label, identical to the wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Potability::Potable => "Potable",
            Potability::NotPotable => "Not Potable",
        }
    }
}

impl std::fmt::Display for Potability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A loaded model ready to score feature payloads.
///
/// Construction requires a predictor, so holding a `PredictionService`
/// is proof the model is loaded. Requests arriving before one exists are
/// refused at the HTTP layer. The service keeps the registry client it
/// was loaded through so readiness probes can report upstream status.
#[derive(Debug)]
pub struct PredictionService {
    predictor: Arc<dyn Predictor>,
    reference: ModelReference,
    registry: RegistryClient,
}

impl PredictionService {
    /// Wrap a loaded predictor together with the reference it was loaded from.
    pub fn new(
        predictor: Arc<dyn Predictor>,
        reference: ModelReference,
        registry: RegistryClient,
    ) -> Self {
        Self {
            predictor,
            reference,
            registry,
        }
    }

    /// Validate a raw JSON payload and score it.
    ///
    /// Validation runs first: an invalid payload is rejected before the
    /// predictor is consulted. Class 1 maps to [`Potability::Potable`],
    /// every other class to [`Potability::NotPotable`].
    pub fn predict(&self, payload: &serde_json::Value) -> Result<Potability> {
        let record = FeatureRecord::from_json(payload)?;
        let class = self.predictor.predict(&record)?;
        Ok(if class == 1 {
            Potability::Potable
        } else {
            Potability::NotPotable
        })
    }

    /// The resolved reference this service is serving.
    pub fn reference(&self) -> &ModelReference {
        &self.reference
    }

    /// Registry handle, for upstream dependency probes.
    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }
}

/// Resolve and load the configured model, retrying transient registry failures.
///
/// This is the two-phase startup barrier: first resolution of the staged
/// version, then artifact loading. Both phases retry per the startup
/// policy; a non-retryable failure (no staged version, undecodable
/// artifact) aborts immediately. Returns only once the model is ready
/// to serve.
pub async fn initialize(config: &GatewayConfig) -> Result<PredictionService> {
    let client = RegistryClient::from_config(&config.model, &config.network);
    let locator = ArtifactLocator::new(client.clone());
    let loader = Arc::new(ModelLoader::new(client.clone()));
    let retry = RetryExecutor::new(RetryConfig::from(&config.startup));

    let model_name = config.model.model_name.clone();
    let stage = config.model.stage;

    let reference = retry
        .execute(|| {
            let locator = locator.clone();
            let model_name = model_name.clone();
            async move { locator.resolve(&model_name, stage).await }
        })
        .await?;

    info!(
        model = %reference.model_name,
        version = reference.version,
        run_id = %reference.run_id,
        stage = %reference.stage,
        "Resolved model version"
    );

    let predictor = retry
        .execute(|| {
            let loader = Arc::clone(&loader);
            let reference = reference.clone();
            async move { loader.load(&reference).await }
        })
        .await?;

    observability::set_model_version(reference.version);

    Ok(PredictionService::new(predictor, reference, client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stage;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    struct FixedPredictor {
        class: u32,
        called: AtomicBool,
    }

    impl FixedPredictor {
        fn new(class: u32) -> Self {
            Self {
                class,
                called: AtomicBool::new(false),
            }
        }
    }

    impl Predictor for FixedPredictor {
        fn predict(&self, _record: &FeatureRecord) -> Result<u32> {
            self.called.store(true, Ordering::SeqCst);
            Ok(self.class)
        }
    }

    fn reference() -> ModelReference {
        ModelReference {
            model_name: "water-potability".to_string(),
            stage: Stage::Staging,
            version: 3,
            run_id: "run-abc".to_string(),
        }
    }

    // Never contacted: predict() stays offline.
    fn idle_registry() -> RegistryClient {
        RegistryClient::new("http://127.0.0.1:9")
    }

    fn full_payload() -> serde_json::Value {
        json!({
            "ph": 7.0,
            "Hardness": 150.0,
            "Solids": 10000.0,
            "Chloramines": 5.0,
            "Sulfate": 250.0,
            "Conductivity": 400.0,
            "Organic_carbon": 10.0,
            "Trihalomethanes": 60.0,
            "Turbidity": 4.0
        })
    }

    #[test]
    fn test_class_one_is_potable() {
        let service =
            PredictionService::new(Arc::new(FixedPredictor::new(1)), reference(), idle_registry());
        let verdict = service.predict(&full_payload()).unwrap();
        assert_eq!(verdict, Potability::Potable);
    }

    #[test]
    fn test_other_classes_are_not_potable() {
        let service =
            PredictionService::new(Arc::new(FixedPredictor::new(0)), reference(), idle_registry());
        let verdict = service.predict(&full_payload()).unwrap();
        assert_eq!(verdict, Potability::NotPotable);
    }

    #[test]
    fn test_invalid_payload_never_reaches_predictor() {
        let predictor = Arc::new(FixedPredictor::new(1));
        let service = PredictionService::new(
            Arc::clone(&predictor) as Arc<dyn Predictor>,
            reference(),
            idle_registry(),
        );

        let mut payload = full_payload();
        payload.as_object_mut().unwrap().remove("Sulfate");

        let err = service.predict(&payload).unwrap_err();
        assert!(matches!(
            err,
            crate::error::GatewayError::Validation { ref field, .. } if field == "Sulfate"
        ));
        assert!(!predictor.called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_potability_wire_labels() {
        assert_eq!(
            serde_json::to_value(Potability::Potable).unwrap(),
            json!("Potable")
        );
        assert_eq!(
            serde_json::to_value(Potability::NotPotable).unwrap(),
            json!("Not Potable")
        );
        assert_eq!(Potability::NotPotable.to_string(), "Not Potable");
    }

    #[test]
    fn test_service_exposes_reference() {
        let service =
            PredictionService::new(Arc::new(FixedPredictor::new(1)), reference(), idle_registry());
        assert_eq!(service.reference().version, 3);
        assert_eq!(service.reference().run_id, "run-abc");
    }
}
