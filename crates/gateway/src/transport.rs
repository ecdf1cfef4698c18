//! Upstream transport for inference calls

use async_trait::async_trait;
use cinemate_common::InferenceError;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Body posted to the inference endpoint
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InferencePayload {
    pub inputs: String,
}

impl InferencePayload {
    pub fn new(inputs: impl Into<String>) -> Self {
        Self {
            inputs: inputs.into(),
        }
    }
}

/// Raw reply from the endpoint. Classification is left to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Value,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one inference payload to one endpoint.
///
/// Connection-level failures are reported as `InferenceError::Upstream`;
/// any HTTP reply, whatever its status, is returned as `Ok`.
#[async_trait]
pub trait InferenceTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        bearer_token: &str,
        payload: &InferencePayload,
    ) -> Result<UpstreamResponse, InferenceError>;
}

/// `reqwest`-backed transport
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl InferenceTransport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        bearer_token: &str,
        payload: &InferencePayload,
    ) -> Result<UpstreamResponse, InferenceError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(bearer_token)
            .json(payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| InferenceError::upstream(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| {
            InferenceError::upstream(format!("Failed to read body from {}: {}", url, e))
        })?;

        // Error pages are not always JSON; keep the text so it can be logged
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
        debug!("Upstream {} answered {}", url, status);

        Ok(UpstreamResponse { status, body })
    }
}
