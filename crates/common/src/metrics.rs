//! Metrics collection for Cinemate
//!
//! Prometheus metrics for the chat surface and the inference gateway.

use lazy_static::lazy_static;
use prometheus::{Histogram, IntCounter, Registry};
use std::sync::Arc;

/// Metrics registry for Cinemate
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    pub registry: Arc<Registry>,
    pub chat: ChatMetrics,
    pub gateway: GatewayMetrics,
}

/// Chat endpoint metrics
#[derive(Debug, Clone)]
pub struct ChatMetrics {
    /// Total number of chat requests
    pub requests_total: IntCounter,

    /// Chat requests that ended in an error response
    pub requests_failed: IntCounter,

    /// End-to-end chat request duration
    pub request_duration: Histogram,
}

/// Inference gateway metrics
#[derive(Debug, Clone)]
pub struct GatewayMetrics {
    /// Real inference calls sent upstream (retries included)
    pub upstream_attempts: IntCounter,

    /// Retries caused by a "model loading" reply
    pub loading_retries: IntCounter,

    /// Warm-up probes sent
    pub warmup_probes: IntCounter,

    /// Calls that gave up after exhausting the retry budget
    pub retry_budget_exhausted: IntCounter,
}

lazy_static! {
    /// Global metrics registry instance
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let registry = Arc::new(Registry::new());

        // Chat metrics
        let requests_total = IntCounter::new(
            "chat_requests_total",
            "Total number of chat requests"
        ).unwrap();

        let requests_failed = IntCounter::new(
            "chat_requests_failed_total",
            "Total number of chat requests answered with an error"
        ).unwrap();

        let request_duration = Histogram::with_opts(
            prometheus::HistogramOpts::new(
                "chat_request_duration_seconds",
                "Chat request duration in seconds"
            ).buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0])
        ).unwrap();

        // Gateway metrics
        let upstream_attempts = IntCounter::new(
            "gateway_upstream_attempts_total",
            "Total number of inference calls sent upstream"
        ).unwrap();

        let loading_retries = IntCounter::new(
            "gateway_loading_retries_total",
            "Retries triggered by a model loading reply"
        ).unwrap();

        let warmup_probes = IntCounter::new(
            "gateway_warmup_probes_total",
            "Warm-up probes sent to the bootstrap endpoint"
        ).unwrap();

        let retry_budget_exhausted = IntCounter::new(
            "gateway_retry_budget_exhausted_total",
            "Calls that failed after exhausting the retry budget"
        ).unwrap();

        // Register all metrics
        registry.register(Box::new(requests_total.clone())).unwrap();
        registry.register(Box::new(requests_failed.clone())).unwrap();
        registry.register(Box::new(request_duration.clone())).unwrap();

        registry.register(Box::new(upstream_attempts.clone())).unwrap();
        registry.register(Box::new(loading_retries.clone())).unwrap();
        registry.register(Box::new(warmup_probes.clone())).unwrap();
        registry.register(Box::new(retry_budget_exhausted.clone())).unwrap();

        let chat = ChatMetrics {
            requests_total,
            requests_failed,
            request_duration,
        };

        let gateway = GatewayMetrics {
            upstream_attempts,
            loading_retries,
            warmup_probes,
            retry_budget_exhausted,
        };

        MetricsRegistry {
            registry,
            chat,
            gateway,
        }
    }

    /// Gather all metrics as text
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
