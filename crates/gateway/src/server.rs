//! HTTP surface for the chat widget
//!
//! Routes are served at the root and again under `/api/v1`.

use crate::client::{InferenceGateway, InferenceRequest};
use crate::transport::InferenceTransport;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use cinemate_common::{InferenceError, METRICS};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

const EMPTY_MESSAGE: &str = "Please ask Something!";
const STILL_LOADING: &str = "Model is still loading, please try again shortly.";
const INTERNAL_ERROR: &str = "Internal server error";

/// Shared handler state
pub struct AppState<T> {
    pub gateway: Arc<InferenceGateway<T>>,
    pub default_model: String,
    pub enable_metrics: bool,
}

impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            default_model: self.default_model.clone(),
            enable_metrics: self.enable_metrics,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub ready: bool,
}

#[derive(Debug, Serialize)]
pub struct ModelList {
    pub models: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors a chat request can end with
#[derive(Debug)]
pub enum ApiError {
    EmptyMessage,
    Inference(InferenceError),
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        ApiError::Inference(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::EmptyMessage => (StatusCode::BAD_REQUEST, EMPTY_MESSAGE),
            ApiError::Inference(e) if e.is_loading() => {
                (StatusCode::SERVICE_UNAVAILABLE, STILL_LOADING)
            }
            ApiError::Inference(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR),
        };

        (
            status,
            Json(ErrorBody {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

/// Build the application router
pub fn router<T>(state: AppState<T>, cors_origin: Option<&str>) -> Router
where
    T: InferenceTransport + 'static,
{
    let api = Router::new()
        .route("/chat", post(chat_handler::<T>))
        .route("/chatbot", post(chat_handler::<T>))
        .route("/modelStatus", get(model_status_handler::<T>))
        .route("/models", get(models_handler::<T>))
        .route("/metrics", get(metrics_handler::<T>));

    Router::new()
        .merge(api.clone())
        .nest("/api/v1", api)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(cors_layer(cors_origin))
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => layer.allow_origin(origin),
        Some(Err(_)) => {
            warn!("Ignoring invalid CORS origin, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}

async fn chat_handler<T>(
    State(state): State<AppState<T>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError>
where
    T: InferenceTransport + 'static,
{
    let request_id = Uuid::new_v4();
    let model = request
        .model
        .clone()
        .unwrap_or_else(|| state.default_model.clone());
    let span = info_span!("chat", %request_id, model = %model);

    async move {
        METRICS.chat.requests_total.inc();
        let timer = METRICS.chat.request_duration.start_timer();

        if request.message.trim().is_empty() {
            METRICS.chat.requests_failed.inc();
            return Err(ApiError::EmptyMessage);
        }

        let result = state
            .gateway
            .submit(&InferenceRequest::new(model.as_str(), request.message))
            .await;
        timer.observe_duration();

        match result {
            Ok(reply) => {
                info!("Chat reply generated ({} chars)", reply.len());
                Ok(Json(ChatReply { reply }))
            }
            Err(e) => {
                METRICS.chat.requests_failed.inc();
                error!("Chat request failed: {}", e);
                Err(e.into())
            }
        }
    }
    .instrument(span)
    .await
}

async fn model_status_handler<T>(State(state): State<AppState<T>>) -> Json<ModelStatus>
where
    T: InferenceTransport + 'static,
{
    Json(ModelStatus {
        ready: state.gateway.readiness(),
    })
}

async fn models_handler<T>(State(state): State<AppState<T>>) -> Json<ModelList>
where
    T: InferenceTransport + 'static,
{
    let models = state
        .gateway
        .catalog()
        .names()
        .into_iter()
        .map(str::to_string)
        .collect();
    Json(ModelList { models })
}

async fn metrics_handler<T>(State(state): State<AppState<T>>) -> Response
where
    T: InferenceTransport + 'static,
{
    if !state.enable_metrics {
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.gather(),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCatalog;
    use crate::client::GatewaySettings;
    use crate::transport::testing::ScriptedTransport;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(transport: ScriptedTransport) -> (Router, Arc<InferenceGateway<ScriptedTransport>>) {
        let settings = GatewaySettings {
            api_token: "hf_test".to_string(),
            warmup_endpoint: "https://probe.test/warmup".to_string(),
            warmup_input: "Hello".to_string(),
            warmup_delay: Duration::from_secs(5),
            default_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
            max_retries: 3,
            warmup_timeout: None,
        };
        let gateway = Arc::new(InferenceGateway::new(
            ModelCatalog::builtin(),
            transport,
            settings,
        ));
        let state = AppState {
            gateway: gateway.clone(),
            default_model: "GPT-2".to_string(),
            enable_metrics: true,
        };
        (router(state, Some("https://cinemate101.netlify.app")), gateway)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Response<Body>) {
        let response = app.oneshot(request).await.unwrap();
        (response.status(), response)
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_chat_success() {
        let (app, _) = app(ScriptedTransport::new().generated("warm").generated("Try Inception."));

        let (status, response) = send(
            app,
            post_json("/chat", json!({ "message": "Movie tonight?", "model": "GPT-2" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "no-store"
        );
        assert_eq!(json_body(response).await, json!({ "reply": "Try Inception." }));
    }

    #[tokio::test]
    async fn test_legacy_route_uses_default_model() {
        let (app, gateway) = app(ScriptedTransport::new().generated("warm").generated("Sure."));

        let (status, response) =
            send(app, post_json("/api/v1/chatbot", json!({ "message": "Hi" }))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "reply": "Sure." }));
        assert_eq!(
            gateway.transport().urls()[1],
            "https://api-inference.huggingface.co/models/gpt2"
        );
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (app, _) = app(ScriptedTransport::new());

        let (status, response) = send(app, post_json("/chat", json!({ "message": "   " }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({ "error": EMPTY_MESSAGE }));
    }

    #[tokio::test]
    async fn test_empty_generation_is_503() {
        let (app, _) = app(ScriptedTransport::new().generated("warm").ok(json!([{}])));

        let (status, response) = send(app, post_json("/chat", json!({ "message": "Hi" }))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await, json!({ "error": STILL_LOADING }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_is_503() {
        let transport = ScriptedTransport::new()
            .generated("warm")
            .loading(Some(1.0))
            .loading(Some(1.0))
            .loading(Some(1.0))
            .loading(Some(1.0));
        let (app, _) = app(transport);

        let (status, _) = send(app, post_json("/chat", json!({ "message": "Hi" }))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_model_is_generic_500() {
        let (app, _) = app(ScriptedTransport::new());

        let (status, response) = send(
            app,
            post_json("/chat", json!({ "message": "Hi", "model": "gpt-5" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({ "error": INTERNAL_ERROR }));
    }

    #[tokio::test]
    async fn test_upstream_error_is_500() {
        let (app, _) = app(ScriptedTransport::new().generated("warm").status(401));

        let (status, _) = send(app, post_json("/chat", json!({ "message": "Hi" }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_model_status_reflects_readiness() {
        let (app, _) = app(ScriptedTransport::new().generated("warm").generated("Hey"));

        let (_, response) = send(app.clone(), get_request("/modelStatus")).await;
        assert_eq!(json_body(response).await, json!({ "ready": false }));

        let (status, _) = send(app.clone(), post_json("/chat", json!({ "message": "Hi" }))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, response) = send(app, get_request("/api/v1/modelStatus")).await;
        assert_eq!(json_body(response).await, json!({ "ready": true }));
    }

    #[tokio::test]
    async fn test_models_listing() {
        let (app, _) = app(ScriptedTransport::new());

        let (status, response) = send(app, get_request("/models")).await;
        let body = json_body(response).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["models"].as_array().unwrap().len(), 21);
        assert_eq!(body["models"][0], "GPT-2");
    }

    #[tokio::test]
    async fn test_metrics_exposed() {
        let (app, _) = app(ScriptedTransport::new());

        let (status, response) = send(app, get_request("/metrics")).await;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        assert_eq!(status, StatusCode::OK);
        assert!(String::from_utf8_lossy(&bytes).contains("gateway_upstream_attempts_total"));
    }

    #[tokio::test]
    async fn test_malformed_json_rejected() {
        let (app, _) = app(ScriptedTransport::new());

        let request = Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let (status, _) = send(app, request).await;

        assert!(status.is_client_error());
    }
}
