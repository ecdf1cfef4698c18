//! Inference gateway client
//!
//! Turns a chat message into clean generated text, hiding the endpoint's
//! cold-start behaviour from callers:
//!
//! - While the readiness cell is unset, a warm-up probe is sent to the
//!   bootstrap endpoint every `warmup_delay` until one succeeds or the
//!   warm-up budget runs out. Concurrent callers share a single warm-up.
//! - A 503 "model loading" reply to a real call resets readiness, waits the
//!   server's `estimated_time` (or `default_backoff`, capped at
//!   `max_backoff`) and retries, at most
//!   `max_retries` times.
//! - Every other failure is returned on first occurrence.

use crate::catalog::{ModelCatalog, ModelDescriptor};
use crate::cleanup::clean_generation;
use crate::readiness::ReadinessCell;
use crate::transport::{InferencePayload, InferenceTransport, UpstreamResponse};
use cinemate_common::{GatewayConfig, InferenceError, METRICS};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// HTTP status the endpoint uses to signal "model is loading"
const LOADING_STATUS: u16 = 503;

/// Tunables for warm-up and retry behaviour
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub api_token: String,
    pub warmup_endpoint: String,
    pub warmup_input: String,
    pub warmup_delay: Duration,
    pub default_backoff: Duration,
    /// Ceiling on any single loading backoff, whatever the server suggests
    pub max_backoff: Duration,
    pub max_retries: u32,
    /// `None` probes until the endpoint answers
    pub warmup_timeout: Option<Duration>,
}

impl From<&GatewayConfig> for GatewaySettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            api_token: config.api_token.clone(),
            warmup_endpoint: config.warmup_endpoint.clone(),
            warmup_input: config.warmup_input.clone(),
            warmup_delay: config.warmup_delay(),
            default_backoff: config.default_backoff(),
            max_backoff: config.max_backoff(),
            max_retries: config.max_retries,
            warmup_timeout: config.warmup_timeout(),
        }
    }
}

/// One text-generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRequest {
    pub model_name: String,
    pub input_text: String,
}

impl InferenceRequest {
    pub fn new(model_name: impl Into<String>, input_text: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            input_text: input_text.into(),
        }
    }
}

/// Gateway in front of the remote inference endpoints
pub struct InferenceGateway<T> {
    catalog: ModelCatalog,
    readiness: ReadinessCell,
    transport: T,
    settings: GatewaySettings,
    warmup_lock: Mutex<()>,
}

impl<T: InferenceTransport> InferenceGateway<T> {
    /// Create a gateway. Readiness starts unset.
    pub fn new(catalog: ModelCatalog, transport: T, settings: GatewaySettings) -> Self {
        Self {
            catalog,
            readiness: ReadinessCell::new(),
            transport,
            settings,
            warmup_lock: Mutex::new(()),
        }
    }

    /// Current readiness, without any network call
    pub fn readiness(&self) -> bool {
        self.readiness.is_ready()
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one request through warm-up, retry and cleanup
    pub async fn submit(&self, request: &InferenceRequest) -> Result<String, InferenceError> {
        let model = self
            .catalog
            .resolve(&request.model_name)
            .ok_or_else(|| InferenceError::UnknownModel(request.model_name.clone()))?;

        if !self.readiness.is_ready() {
            self.warm_up().await?;
        }

        let generated = self.call_with_retry(model, &request.input_text).await?;
        let cleaned = clean_generation(&request.input_text, &generated);

        if cleaned.is_empty() {
            return Err(InferenceError::EmptyGeneration(model.name.clone()));
        }

        Ok(cleaned)
    }

    /// Probe the bootstrap endpoint until it answers successfully
    async fn warm_up(&self) -> Result<(), InferenceError> {
        let _guard = self.warmup_lock.lock().await;

        // Another caller may have finished warming while we waited
        if self.readiness.is_ready() {
            debug!("Endpoint warmed by a concurrent caller");
            return Ok(());
        }

        let started = Instant::now();
        let payload = InferencePayload::new(self.settings.warmup_input.as_str());
        let mut probes: u64 = 0;

        info!("Warming up inference endpoint {}", self.settings.warmup_endpoint);

        loop {
            probes += 1;
            METRICS.gateway.warmup_probes.inc();

            match self
                .transport
                .post(&self.settings.warmup_endpoint, &self.settings.api_token, &payload)
                .await
            {
                Ok(response) if response.is_success() => {
                    self.readiness.mark_ready();
                    info!(
                        "Inference endpoint ready after {} probe(s) in {:?}",
                        probes,
                        started.elapsed()
                    );
                    return Ok(());
                }
                Ok(response) => {
                    debug!("Warm-up probe {} answered HTTP {}", probes, response.status);
                }
                Err(e) => {
                    warn!("Warm-up probe {} failed: {}", probes, e);
                }
            }

            if let Some(budget) = self.settings.warmup_timeout {
                if started.elapsed() + self.settings.warmup_delay > budget {
                    warn!(
                        "Giving up warm-up after {} probe(s) ({:?} budget)",
                        probes, budget
                    );
                    return Err(InferenceError::WarmupTimeout {
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }

            sleep(self.settings.warmup_delay).await;
        }
    }

    /// Send the real call, retrying on "model loading" replies
    async fn call_with_retry(
        &self,
        model: &ModelDescriptor,
        input: &str,
    ) -> Result<String, InferenceError> {
        let payload = InferencePayload::new(input);
        let mut retries: u32 = 0;

        loop {
            let attempt = retries + 1;
            METRICS.gateway.upstream_attempts.inc();

            let response = self
                .transport
                .post(&model.endpoint_url, &self.settings.api_token, &payload)
                .await
                .map_err(|e| {
                    warn!("Model {} attempt {} failed: {}", model.name, attempt, e);
                    e
                })?;

            if response.status == LOADING_STATUS {
                self.readiness.mark_loading();

                if retries >= self.settings.max_retries {
                    METRICS.gateway.retry_budget_exhausted.inc();
                    warn!(
                        "Model {} still loading after {} retries, giving up",
                        model.name, retries
                    );
                    return Err(InferenceError::RetryBudgetExhausted {
                        model: model.name.clone(),
                        retries,
                    });
                }

                let wait = estimated_wait(&response.body)
                    .unwrap_or(self.settings.default_backoff)
                    .min(self.settings.max_backoff);
                info!(
                    "Model {} loading on attempt {}, retrying in {:?}",
                    model.name, attempt, wait
                );
                sleep(wait).await;

                retries += 1;
                METRICS.gateway.loading_retries.inc();
                continue;
            }

            if !response.is_success() {
                warn!(
                    "Model {} attempt {} answered HTTP {}",
                    model.name, attempt, response.status
                );
                return Err(upstream_failure(model, &response));
            }

            self.readiness.mark_ready();
            debug!("Model {} answered on attempt {}", model.name, attempt);

            return extract_generated_text(&response.body)
                .ok_or_else(|| InferenceError::EmptyGeneration(model.name.clone()));
        }
    }
}

/// Server-suggested wait from a loading reply
fn estimated_wait(body: &Value) -> Option<Duration> {
    body.get("estimated_time")
        .and_then(Value::as_f64)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// First `generated_text` of a `[{ generated_text }, ...]` reply
fn extract_generated_text(body: &Value) -> Option<String> {
    let first = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };
    first.get("generated_text")?.as_str().map(str::to_string)
}

fn upstream_failure(model: &ModelDescriptor, response: &UpstreamResponse) -> InferenceError {
    let detail = response
        .body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("no detail");
    InferenceError::upstream(format!(
        "{} returned HTTP {}: {}",
        model.name, response.status, detail
    ))
}
