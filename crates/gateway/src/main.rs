//! Cinemate Gateway - Main Entry Point
//!
//! Loads configuration, builds the inference gateway and serves the chat API.

use cinemate_common::{CinemateConfig, Result};
use cinemate_gateway::server::{self, AppState};
use cinemate_gateway::{GatewaySettings, HttpTransport, InferenceGateway, ModelCatalog};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::var("CINEMATE_CONFIG")
        .unwrap_or_else(|_| "configs/gateway-config.yaml".to_string());

    let config = if Path::new(&config_path).exists() {
        let mut config = CinemateConfig::from_file(&config_path)?;
        config.apply_env_overrides()?;
        config
    } else {
        CinemateConfig::from_env()?
    };

    // Initialize logging
    let default_filter = format!(
        "cinemate_gateway={level},cinemate_common={level},tower_http=info,axum=info",
        level = config.observability.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cinemate Gateway");
    config.validate()?;

    let catalog = ModelCatalog::from_entries(&config.gateway.models)?;
    catalog.check_default(&config.gateway.default_model)?;

    info!(
        "Gateway configuration loaded: bind={}, models={}, default_model={}, max_retries={}",
        config.listen_address(),
        catalog.len(),
        config.gateway.default_model,
        config.gateway.max_retries
    );

    let transport = HttpTransport::new(config.gateway.request_timeout());
    let gateway = Arc::new(InferenceGateway::new(
        catalog,
        transport,
        GatewaySettings::from(&config.gateway),
    ));

    let state = AppState {
        gateway,
        default_model: config.gateway.default_model.clone(),
        enable_metrics: config.observability.enable_metrics,
    };
    let app = server::router(state, config.cors_origin.as_deref());

    let listener = TcpListener::bind(config.listen_address()).await?;
    info!("Cinemate Gateway listening on {}", config.listen_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Cinemate Gateway shutdown complete");
    Ok(())
}
