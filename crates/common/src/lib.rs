//! Cinemate common library
//!
//! Configuration, error types and metrics shared by the Cinemate services.

pub mod config;
pub mod error;
pub mod metrics;

// Re-export commonly used types
pub use config::{CinemateConfig, GatewayConfig, ModelEntry};
pub use error::{CinemateError, InferenceError, Result};
pub use metrics::{MetricsRegistry, METRICS};
