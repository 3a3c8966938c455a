//! Model references, deployment stages, and predictor backends.
//!
//! A [`ModelReference`] identifies exactly one trained artifact in the
//! registry. The artifact itself is an opaque document decoded into a
//! [`Predictor`], the single capability the serving layer sees. The concrete
//! inference backend is swappable behind that trait; the gateway ships a
//! linear (logistic) backend matching the exported classifier.

pub mod loader;

pub use loader::ModelLoader;

use crate::error::{GatewayError, Result};
use crate::features::{FeatureRecord, FEATURE_FIELDS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Deployment lifecycle stage of a model version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Promoted for pre-production validation.
    Staging,
    /// Promoted for production serving.
    Production,
    /// Retired from serving.
    Archived,
    /// Registered but not promoted anywhere.
    None,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Staging => "Staging",
            Stage::Production => "Production",
            Stage::Archived => "Archived",
            Stage::None => "None",
        };
        f.write_str(name)
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "staging" => Ok(Stage::Staging),
            "production" => Ok(Stage::Production),
            "archived" => Ok(Stage::Archived),
            "none" => Ok(Stage::None),
            other => Err(format!(
                "Unknown stage '{}' (expected Staging, Production, Archived, or None)",
                other
            )),
        }
    }
}

/// Identifies exactly one trained artifact within a registry.
///
/// `(model_name, version)` uniquely determines `run_id`; the full reference
/// is the cache key for loaded predictors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelReference {
    /// Logical model name in the registry.
    pub model_name: String,
    /// Stage the version was resolved from.
    pub stage: Stage,
    /// Registry version number.
    pub version: u64,
    /// Training run that produced the artifact.
    pub run_id: String,
}

/// An invocable predictor bound to one model artifact.
///
/// Implementations must be safe for concurrent read-only invocation; the
/// gateway shares a single instance across all in-flight requests without
/// locking.
pub trait Predictor: fmt::Debug + Send + Sync {
    /// Map a validated feature record to a class index.
    fn predict(&self, record: &FeatureRecord) -> Result<u32>;
}

/// A serialized model artifact, tagged by format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ModelArtifact {
    /// Binary logistic model over the nine feature fields.
    Linear(LinearArtifact),
}

/// Exported coefficients of a binary logistic classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearArtifact {
    /// Bias term.
    pub intercept: f64,
    /// Per-feature weights, keyed by feature field name.
    pub coefficients: HashMap<String, f64>,
    /// Decision threshold on the positive-class probability.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

/// Decode raw artifact bytes into an invocable predictor.
pub fn decode_artifact(bytes: &[u8]) -> Result<Arc<dyn Predictor>> {
    let artifact: ModelArtifact = serde_json::from_slice(bytes)
        .map_err(|e| GatewayError::ModelLoadFailed(format!("Undecodable artifact: {}", e)))?;

    match artifact {
        ModelArtifact::Linear(linear) => Ok(Arc::new(LinearClassifier::from_artifact(linear)?)),
    }
}

/// Logistic classifier over the nine water-quality features.
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    intercept: f64,
    // Aligned with FEATURE_FIELDS order.
    weights: [f64; FEATURE_FIELDS.len()],
    threshold: f64,
}

impl LinearClassifier {
    /// Build a classifier from an exported artifact document.
    pub fn from_artifact(artifact: LinearArtifact) -> Result<Self> {
        if !artifact.intercept.is_finite() {
            return Err(GatewayError::ModelLoadFailed(
                "Intercept must be finite".to_string(),
            ));
        }
        if !artifact.threshold.is_finite()
            || artifact.threshold <= 0.0
            || artifact.threshold >= 1.0
        {
            return Err(GatewayError::ModelLoadFailed(format!(
                "Threshold must be in (0, 1), got {}",
                artifact.threshold
            )));
        }

        let mut weights = [0.0; FEATURE_FIELDS.len()];
        for (i, field) in FEATURE_FIELDS.iter().enumerate() {
            let weight = artifact.coefficients.get(*field).ok_or_else(|| {
                GatewayError::ModelLoadFailed(format!("Missing coefficient for '{}'", field))
            })?;
            if !weight.is_finite() {
                return Err(GatewayError::ModelLoadFailed(format!(
                    "Coefficient for '{}' must be finite",
                    field
                )));
            }
            weights[i] = *weight;
        }

        Ok(Self {
            intercept: artifact.intercept,
            weights,
            threshold: artifact.threshold,
        })
    }

    /// Positive-class probability for a feature record.
    fn score(&self, record: &FeatureRecord) -> f64 {
        let z = self
            .weights
            .iter()
            .zip(record.values())
            .fold(self.intercept, |acc, (w, x)| acc + w * x);
        1.0 / (1.0 + (-z).exp())
    }
}

impl Predictor for LinearClassifier {
    fn predict(&self, record: &FeatureRecord) -> Result<u32> {
        let score = self.score(record);
        if !score.is_finite() {
            return Err(GatewayError::InferenceFailed(
                "Non-finite score".to_string(),
            ));
        }
        Ok(if score >= self.threshold { 1 } else { 0 })
    }
}
