//! Configuration structures for Cinemate
//!
//! Configuration is loaded from a YAML file when one is present and can be
//! overridden by environment variables. Without a file the environment alone
//! is used, on top of the defaults below.

use crate::error::{CinemateError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Top-level configuration for the gateway service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CinemateConfig {
    /// Server binding address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origin (any origin when unset)
    #[serde(default)]
    pub cors_origin: Option<String>,

    /// Inference gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Inference gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bearer token for the inference endpoint
    #[serde(default)]
    pub api_token: String,

    /// Model used when a chat request does not name one
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Endpoint probed during warm-up
    #[serde(default = "default_warmup_endpoint")]
    pub warmup_endpoint: String,

    /// Throwaway input sent with each warm-up probe
    #[serde(default = "default_warmup_input")]
    pub warmup_input: String,

    /// Delay between failed warm-up probes
    #[serde(default = "default_warmup_delay")]
    pub warmup_delay_secs: u64,

    /// Backoff used when a "loading" reply carries no estimate
    #[serde(default = "default_backoff")]
    pub default_backoff_secs: u64,

    /// Upper bound on any single loading backoff
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Retries allowed after the first "loading" reply
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Upper bound on the whole warm-up loop (`null` = probe until success)
    #[serde(default = "default_warmup_timeout")]
    pub warmup_timeout_secs: Option<u64>,

    /// Timeout of a single upstream HTTP request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Model catalog override (built-in catalog when empty)
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

/// One configured model endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelEntry {
    pub name: String,
    pub endpoint_url: String,
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Expose Prometheus metrics on /metrics
    #[serde(default = "default_metrics")]
    pub enable_metrics: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            enable_metrics: default_metrics(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            default_model: default_model(),
            warmup_endpoint: default_warmup_endpoint(),
            warmup_input: default_warmup_input(),
            warmup_delay_secs: default_warmup_delay(),
            default_backoff_secs: default_backoff(),
            max_backoff_secs: default_max_backoff(),
            max_retries: default_max_retries(),
            warmup_timeout_secs: default_warmup_timeout(),
            request_timeout_secs: default_request_timeout(),
            models: Vec::new(),
        }
    }
}

/// Default value functions
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_model() -> String {
    "GPT-2".to_string()
}

fn default_warmup_endpoint() -> String {
    "https://api-inference.huggingface.co/models/gpt2".to_string()
}

fn default_warmup_input() -> String {
    "Hello".to_string()
}

fn default_warmup_delay() -> u64 {
    5
}

fn default_backoff() -> u64 {
    5
}

fn default_max_backoff() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_warmup_timeout() -> Option<u64> {
    Some(300)
}

fn default_request_timeout() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics() -> bool {
    true
}

impl CinemateConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: Into<PathBuf>>(path: P) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            CinemateError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config = Self::from_yaml(&content).map_err(|e| {
            CinemateError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let mut config = CinemateConfig {
            bind_address: default_bind_address(),
            port: default_port(),
            cors_origin: None,
            gateway: GatewayConfig::default(),
            observability: ObservabilityConfig::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply process environment overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// `REACT_HFT_API_KEY` is accepted as a fallback token name so existing
    /// deployments keep working.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .parse()
                .map_err(|_| CinemateError::Config(format!("Invalid port number: {}", port)))?;
        }
        if let Some(addr) = lookup("CINEMATE_BIND_ADDRESS") {
            self.bind_address = addr;
        }
        if let Some(token) = lookup("HF_API_TOKEN").or_else(|| lookup("REACT_HFT_API_KEY")) {
            self.gateway.api_token = token;
        }
        if let Some(origin) = lookup("CINEMATE_CORS_ORIGIN") {
            self.cors_origin = Some(origin);
        }
        if let Some(model) = lookup("CINEMATE_DEFAULT_MODEL") {
            self.gateway.default_model = model;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(CinemateError::config("Port must be non-zero"));
        }
        if self.gateway.api_token.trim().is_empty() {
            return Err(CinemateError::config(
                "Inference API token missing (set HF_API_TOKEN)",
            ));
        }
        if self.gateway.default_model.is_empty() {
            return Err(CinemateError::config("Default model must not be empty"));
        }
        if !self.gateway.warmup_endpoint.starts_with("http://")
            && !self.gateway.warmup_endpoint.starts_with("https://")
        {
            return Err(CinemateError::config(format!(
                "Invalid warm-up endpoint: {}",
                self.gateway.warmup_endpoint
            )));
        }
        Ok(())
    }

    /// Get the socket address string to bind
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl GatewayConfig {
    pub fn warmup_delay(&self) -> Duration {
        Duration::from_secs(self.warmup_delay_secs)
    }

    pub fn default_backoff(&self) -> Duration {
        Duration::from_secs(self.default_backoff_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    pub fn warmup_timeout(&self) -> Option<Duration> {
        self.warmup_timeout_secs.map(Duration::from_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_yaml_defaults() {
        let config = CinemateConfig::from_yaml("gateway:\n  api_token: hf_test\n").unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.gateway.max_retries, 3);
        assert_eq!(config.gateway.warmup_delay(), Duration::from_secs(5));
        assert_eq!(config.gateway.default_backoff(), Duration::from_secs(5));
        assert_eq!(config.gateway.max_backoff(), Duration::from_secs(60));
        assert_eq!(config.gateway.warmup_timeout(), Some(Duration::from_secs(300)));
        assert!(config.gateway.models.is_empty());
        assert!(config.observability.enable_metrics);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unbounded_warmup_from_yaml() {
        let yaml = "gateway:\n  api_token: hf_test\n  warmup_timeout_secs: null\n";
        let config = CinemateConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.gateway.warmup_timeout(), None);
    }

    #[test]
    fn test_model_override_from_yaml() {
        let yaml = r#"
port: 8080
gateway:
  api_token: hf_test
  default_model: Local
  models:
    - name: Local
      endpoint_url: http://localhost:9000/generate
"#;
        let config = CinemateConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.listen_address(), "0.0.0.0:8080");
        assert_eq!(config.gateway.models.len(), 1);
        assert_eq!(config.gateway.models[0].name, "Local");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "4100"),
            ("REACT_HFT_API_KEY", "hf_legacy"),
            ("CINEMATE_CORS_ORIGIN", "https://cinemate101.netlify.app"),
        ]
        .into_iter()
        .collect();

        let mut config = CinemateConfig::from_yaml("gateway: {}\n").unwrap();
        config
            .apply_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.port, 4100);
        assert_eq!(config.gateway.api_token, "hf_legacy");
        assert_eq!(
            config.cors_origin.as_deref(),
            Some("https://cinemate101.netlify.app")
        );
    }

    #[test]
    fn test_preferred_token_wins() {
        let env: HashMap<&str, &str> =
            [("HF_API_TOKEN", "hf_new"), ("REACT_HFT_API_KEY", "hf_legacy")]
                .into_iter()
                .collect();

        let mut config = CinemateConfig::from_yaml("gateway: {}\n").unwrap();
        config
            .apply_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.gateway.api_token, "hf_new");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = CinemateConfig::from_yaml("gateway: {}\n").unwrap();
        let result = config.apply_overrides_from(|key| {
            (key == "PORT").then(|| "not-a-port".to_string())
        });

        assert!(result.is_err());
    }

    #[test]
    fn test_config_validation_missing_token() {
        let config = CinemateConfig::from_yaml("gateway: {}\n").unwrap();

        assert!(config.validate().is_err());
    }
}
