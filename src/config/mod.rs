//! Configuration module for aquagate.
//!
//! Configuration is read once at startup, either from a JSON file or from
//! `AQUAGATE_*` environment variables, and is immutable afterwards. Changing
//! any setting requires a process restart.

use crate::error::{GatewayError, Result};
use crate::model::Stage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Main configuration for the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Model resolution configuration.
    pub model: ModelConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
    /// Outbound network configuration.
    pub network: NetworkConfig,
    /// Startup retry policy.
    pub startup: StartupConfig,
    /// Observability configuration.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// Load configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `AQUAGATE_*` environment variables.
    ///
    /// `AQUAGATE_REGISTRY_URL` is required; everything else falls back to
    /// defaults. `AQUAGATE_REGISTRY_TOKEN` populates both halves of the
    /// basic-auth credential pair, with `AQUAGATE_REGISTRY_USERNAME` and
    /// `AQUAGATE_REGISTRY_PASSWORD` taking precedence when both are set.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    fn from_env_with(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        config.model.registry_url = get("AQUAGATE_REGISTRY_URL").ok_or_else(|| {
            GatewayError::InvalidConfig {
                field: "model.registry_url".to_string(),
                reason: "AQUAGATE_REGISTRY_URL is not set".to_string(),
            }
        })?;

        if let Some(experiment) = get("AQUAGATE_EXPERIMENT") {
            config.model.experiment = experiment;
        }
        if let Some(name) = get("AQUAGATE_MODEL_NAME") {
            config.model.model_name = name;
        }
        if let Some(stage) = get("AQUAGATE_STAGE") {
            config.model.stage =
                stage
                    .parse()
                    .map_err(|reason: String| GatewayError::InvalidConfig {
                        field: "model.stage".to_string(),
                        reason,
                    })?;
        }

        if let Some(token) = get("AQUAGATE_REGISTRY_TOKEN") {
            config.model.credentials = Some(RegistryCredentials {
                username: token.clone(),
                password: token,
            });
        }
        if let (Some(username), Some(password)) = (
            get("AQUAGATE_REGISTRY_USERNAME"),
            get("AQUAGATE_REGISTRY_PASSWORD"),
        ) {
            config.model.credentials = Some(RegistryCredentials { username, password });
        }

        if let Some(bind) = get("AQUAGATE_BIND") {
            config.server.bind_addr =
                bind.parse()
                    .map_err(|e| GatewayError::InvalidConfig {
                        field: "server.bind_addr".to_string(),
                        reason: format!("Invalid socket address: {}", e),
                    })?;
        }

        if let Some(level) = get("AQUAGATE_LOG_LEVEL") {
            config.observability.log_level = level;
        }
        if let Some(addr) = get("AQUAGATE_METRICS_ADDR") {
            config.observability.metrics_addr =
                addr.parse()
                    .map_err(|e| GatewayError::InvalidConfig {
                        field: "observability.metrics_addr".to_string(),
                        reason: format!("Invalid socket address: {}", e),
                    })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.model.registry_url.is_empty() {
            return Err(GatewayError::InvalidConfig {
                field: "model.registry_url".to_string(),
                reason: "Registry URL must not be empty".to_string(),
            });
        }

        if !self.model.registry_url.starts_with("http://")
            && !self.model.registry_url.starts_with("https://")
        {
            return Err(GatewayError::InvalidConfig {
                field: "model.registry_url".to_string(),
                reason: "Registry URL must start with http:// or https://".to_string(),
            });
        }

        if self.model.model_name.is_empty() {
            return Err(GatewayError::InvalidConfig {
                field: "model.model_name".to_string(),
                reason: "Model name must not be empty".to_string(),
            });
        }

        if self.startup.max_attempts == 0 {
            return Err(GatewayError::InvalidConfig {
                field: "startup.max_attempts".to_string(),
                reason: "At least one attempt is required".to_string(),
            });
        }

        if self.startup.multiplier < 1.0 {
            return Err(GatewayError::InvalidConfig {
                field: "startup.multiplier".to_string(),
                reason: "Backoff multiplier must be >= 1.0".to_string(),
            });
        }

        Ok(())
    }

    /// Create a minimal development configuration.
    pub fn development() -> Self {
        Self {
            model: ModelConfig {
                registry_url: "http://127.0.0.1:5000".to_string(),
                ..ModelConfig::default()
            },
            server: ServerConfig {
                bind_addr: "127.0.0.1:8080".parse().expect("valid socket address"),
            },
            network: NetworkConfig::default(),
            startup: StartupConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(1),
                multiplier: 2.0,
                jitter: false,
            },
            observability: ObservabilityConfig {
                metrics_enabled: false,
                log_level: "debug".to_string(),
                ..ObservabilityConfig::default()
            },
        }
    }
}

/// Model resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the model registry.
    pub registry_url: String,
    /// Experiment namespace the model was trained under.
    pub experiment: String,
    /// Logical model name to resolve.
    pub model_name: String,
    /// Deployment stage to resolve against.
    pub stage: Stage,
    /// Registry credentials, if the registry requires authentication.
    #[serde(default)]
    pub credentials: Option<RegistryCredentials>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            registry_url: "http://127.0.0.1:5000".to_string(),
            experiment: "water-potability".to_string(),
            model_name: "water-potability".to_string(),
            stage: Stage::Staging,
            credentials: None,
        }
    }
}

/// HTTP basic-auth credentials for the registry.
#[derive(Clone, Serialize, Deserialize)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    // Secrets must never reach logs, even through {:?} on the config tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the gateway.
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().expect("valid socket address"),
        }
    }
}

/// Outbound network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Connection timeout.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Request timeout.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Retry policy for the startup barrier.
///
/// Applies only while resolving and loading the model at process start.
/// Steady-state request serving never retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Initial delay before first retry.
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
    /// Add jitter to delays.
    pub jitter: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Enable Prometheus metrics.
    pub metrics_enabled: bool,
    /// Metrics bind address.
    pub metrics_addr: SocketAddr,
    /// Log level.
    pub log_level: String,
    /// Enable JSON logging.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            metrics_addr: "0.0.0.0:9090".parse().expect("valid socket address"),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Serde helper for Duration using humantime format.
pub mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    fn parse_duration(s: &str) -> Result<Duration, String> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        } else if let Some(s_val) = s.strip_suffix('s') {
            s_val
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| e.to_string())
        } else if let Some(m) = s.strip_suffix('m') {
            m.parse::<u64>()
                .map(|v| Duration::from_secs(v * 60))
                .map_err(|e| e.to_string())
        } else {
            s.parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.model.stage, Stage::Staging);
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn test_development_config() {
        let config = GatewayConfig::development();
        assert!(config.validate().is_ok());
        assert!(!config.observability.metrics_enabled);
        assert_eq!(config.startup.max_attempts, 2);
    }

    #[test]
    fn test_from_env_requires_registry_url() {
        let err = GatewayConfig::from_env_with(env(&[])).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::InvalidConfig { ref field, .. } if field == "model.registry_url"
        ));
    }

    #[test]
    fn test_from_env_full() {
        let config = GatewayConfig::from_env_with(env(&[
            ("AQUAGATE_REGISTRY_URL", "https://registry.example.com"),
            ("AQUAGATE_MODEL_NAME", "potability-v2"),
            ("AQUAGATE_STAGE", "production"),
            ("AQUAGATE_BIND", "127.0.0.1:9999"),
        ]))
        .unwrap();

        assert_eq!(config.model.registry_url, "https://registry.example.com");
        assert_eq!(config.model.model_name, "potability-v2");
        assert_eq!(config.model.stage, Stage::Production);
        assert_eq!(config.server.bind_addr.port(), 9999);
    }

    #[test]
    fn test_from_env_token_fills_both_credential_halves() {
        let config = GatewayConfig::from_env_with(env(&[
            ("AQUAGATE_REGISTRY_URL", "http://registry.example.com"),
            ("AQUAGATE_REGISTRY_TOKEN", "s3cret"),
        ]))
        .unwrap();

        let creds = config.model.credentials.expect("credentials set");
        assert_eq!(creds.username, "s3cret");
        assert_eq!(creds.password, "s3cret");
    }

    #[test]
    fn test_from_env_explicit_credentials_win_over_token() {
        let config = GatewayConfig::from_env_with(env(&[
            ("AQUAGATE_REGISTRY_URL", "http://registry.example.com"),
            ("AQUAGATE_REGISTRY_TOKEN", "token"),
            ("AQUAGATE_REGISTRY_USERNAME", "svc-user"),
            ("AQUAGATE_REGISTRY_PASSWORD", "svc-pass"),
        ]))
        .unwrap();

        let creds = config.model.credentials.expect("credentials set");
        assert_eq!(creds.username, "svc-user");
        assert_eq!(creds.password, "svc-pass");
    }

    #[test]
    fn test_from_env_rejects_unknown_stage() {
        let err = GatewayConfig::from_env_with(env(&[
            ("AQUAGATE_REGISTRY_URL", "http://registry.example.com"),
            ("AQUAGATE_STAGE", "canary"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::InvalidConfig { ref field, .. } if field == "model.stage"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_registry_url() {
        let mut config = GatewayConfig::default();
        config.model.registry_url = "registry.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = GatewayConfig::default();
        config.startup.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let creds = RegistryCredentials {
            username: "svc-user".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("svc-user"));
    }

    #[test]
    fn test_from_file_round_trip() {
        let config = GatewayConfig::development();
        let json = serde_json::to_string_pretty(&config).unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = GatewayConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded.model.model_name, config.model.model_name);
        assert_eq!(loaded.network.connect_timeout, config.network.connect_timeout);
        assert_eq!(loaded.startup.initial_delay, config.startup.initial_delay);
    }
}
