//! Common error types for Cinemate
//!
//! `CinemateError` covers process-level failures (configuration, I/O, startup).
//! `InferenceError` is the taxonomy returned by the inference gateway; the HTTP
//! layer maps it onto user-facing status codes.

use thiserror::Error;

/// Main error type for Cinemate
#[derive(Error, Debug)]
pub enum CinemateError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Inference gateway failures
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CinemateError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        CinemateError::Config(msg.into())
    }
}

/// Failures of a single `submit` call against the inference endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Requested model is not in the catalog. No network call was made.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Endpoint kept reporting "loading" after every allowed retry
    #[error("Model {model} still loading after {retries} retries")]
    RetryBudgetExhausted { model: String, retries: u32 },

    /// Warm-up probing did not succeed within the configured budget
    #[error("Warm-up did not complete within {waited_secs}s")]
    WarmupTimeout { waited_secs: u64 },

    /// Response was well-formed but carried no generated text
    #[error("Model {0} returned no generated text")]
    EmptyGeneration(String),

    /// Any other transport or HTTP failure
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl InferenceError {
    /// Create an upstream error
    pub fn upstream(msg: impl Into<String>) -> Self {
        InferenceError::Upstream(msg.into())
    }

    /// True for the failures users should see as "model still loading"
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            InferenceError::RetryBudgetExhausted { .. }
                | InferenceError::WarmupTimeout { .. }
                | InferenceError::EmptyGeneration(_)
        )
    }
}

/// Result type alias for Cinemate operations
pub type Result<T> = std::result::Result<T, CinemateError>;
