//! Cinemate Gateway
//!
//! Chat backend for Cinemate. Forwards chat messages to hosted text-generation
//! endpoints, riding out their cold starts, and serves the replies over HTTP.

pub mod catalog;
pub mod cleanup;
pub mod client;
pub mod readiness;
pub mod server;
pub mod transport;

pub use catalog::{ModelCatalog, ModelDescriptor};
pub use client::{GatewaySettings, InferenceGateway, InferenceRequest};
pub use readiness::ReadinessCell;
pub use transport::{HttpTransport, InferencePayload, InferenceTransport, UpstreamResponse};
