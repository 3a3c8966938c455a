//! Error types for the aquagate model serving gateway.
//!
//! This module provides a unified error type [`GatewayError`] for all gateway
//! operations, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! Errors are organized into the following categories:
//!
//! - **Resolution**: registry lookup and version selection failures
//! - **Loading**: artifact fetch and deserialization failures
//! - **Request**: per-request validation and inference failures
//! - **Network**: connection and timeout errors
//! - **Configuration**: invalid settings or missing configuration
//!
//! Startup-fatal errors (`RegistryUnavailable`, `NoStagedVersion`,
//! `ModelLoadFailed`) abort initialization before the listener binds.
//! Per-request errors (`Validation`, `ServiceNotReady`, `InferenceFailed`)
//! are translated into HTTP responses at the serving boundary and never
//! crash the process.
//!
//! # Example
//!
//! ```rust
//! use aquagate::error::{GatewayError, Result};
//!
//! fn parse_threshold(raw: &str) -> Result<f64> {
//!     raw.parse()
//!         .map_err(|_| GatewayError::Validation {
//!             field: "threshold".to_string(),
//!             reason: "expected a number".to_string(),
//!         })
//! }
//!
//! fn handle_error(err: &GatewayError) {
//!     if err.is_retryable() {
//!         println!("Retrying operation...");
//!     } else {
//!         println!("Fatal error: {}", err);
//!     }
//! }
//! ```

use crate::model::Stage;
use std::io;
use thiserror::Error;

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum GatewayError {
    // Model resolution errors
    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("No version of model '{model_name}' staged in {stage}")]
    NoStagedVersion { model_name: String, stage: Stage },

    // Model loading errors
    #[error("Model load failed: {0}")]
    ModelLoadFailed(String),

    // Per-request errors
    #[error("Invalid field '{field}': {reason}")]
    Validation { field: String, reason: String },

    #[error("Service not ready: model not loaded")]
    ServiceNotReady,

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    // Serialization errors
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // External errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Check if error is retryable.
    ///
    /// Only transient transport failures qualify. A missing staged version or
    /// an undecodable artifact requires operator intervention, retrying them
    /// would just delay the failure.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayError::RegistryUnavailable(_)
                | GatewayError::Network(_)
                | GatewayError::Timeout(_)
        )
    }

    /// Check if error aborts process startup.
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            GatewayError::RegistryUnavailable(_)
                | GatewayError::NoStagedVersion { .. }
                | GatewayError::ModelLoadFailed(_)
        )
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Deserialization(e.to_string())
    }
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GatewayError::RegistryUnavailable("connection refused".into()).is_retryable());
        assert!(GatewayError::Network("reset".into()).is_retryable());
        assert!(GatewayError::Timeout(5000).is_retryable());

        assert!(!GatewayError::NoStagedVersion {
            model_name: "water-potability".into(),
            stage: Stage::Staging,
        }
        .is_retryable());
        assert!(!GatewayError::ModelLoadFailed("bad artifact".into()).is_retryable());
        assert!(!GatewayError::ServiceNotReady.is_retryable());
    }

    #[test]
    fn test_startup_fatal_classification() {
        assert!(GatewayError::RegistryUnavailable("down".into()).is_startup_fatal());
        assert!(GatewayError::NoStagedVersion {
            model_name: "water-potability".into(),
            stage: Stage::Production,
        }
        .is_startup_fatal());
        assert!(GatewayError::ModelLoadFailed("truncated".into()).is_startup_fatal());

        assert!(!GatewayError::ServiceNotReady.is_startup_fatal());
        assert!(!GatewayError::Validation {
            field: "ph".into(),
            reason: "missing".into(),
        }
        .is_startup_fatal());
    }

    #[test]
    fn test_display_includes_context() {
        let err = GatewayError::NoStagedVersion {
            model_name: "water-potability".into(),
            stage: Stage::Staging,
        };
        let msg = err.to_string();
        assert!(msg.contains("water-potability"));
        assert!(msg.contains("Staging"));

        let err = GatewayError::Validation {
            field: "ph".into(),
            reason: "missing required field".into(),
        };
        assert!(err.to_string().contains("ph"));
    }
}
