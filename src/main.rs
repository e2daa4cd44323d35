use anyhow::{Context, Result};
use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use courtside::api::{create_router, AppState};
use courtside::config::{self, CourtsideConfig};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courtside=info".into()),
        )
        .init();

    info!("Courtside starting...");

    let config_path =
        std::env::var("COURTSIDE_CONFIG").unwrap_or_else(|_| "courtside.toml".to_string());

    let mut config = if std::path::Path::new(&config_path).exists() {
        match config::load_config(&config_path) {
            Ok(config) => config,
            Err(e) => anyhow::bail!("Failed to load {}: {}", config_path, e),
        }
    } else {
        info!(path = %config_path, "No config file found, using defaults");
        CourtsideConfig::default()
    };
    config.apply_env_overrides();

    info!(
        bind_addr = %config.server.bind_addr,
        environment = %config.server.environment,
        region = config.cognito.region.as_deref().unwrap_or("unset"),
        backend_host = config.backend.host.as_deref().unwrap_or("unset"),
        "Configuration loaded"
    );

    if config.cognito.region.is_none() {
        warn!("Cognito region is not configured; provider operations will fail closed");
    }

    // Session cookies ride on cross-origin requests, so CORS has to allow
    // credentials. Without a configured origin the layer mirrors the caller.
    let cors = match config.server.frontend_origin.as_deref() {
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid frontend origin: {origin}"))?;
            CorsLayer::new()
                .allow_headers([CONTENT_TYPE])
                .allow_methods([Method::GET, Method::POST])
                .allow_origin(AllowOrigin::exact(origin))
                .allow_credentials(true)
        }
        None => {
            if config.server.is_prod() {
                warn!("No frontend origin configured; mirroring request origins");
            }
            CorsLayer::very_permissive()
        }
    };

    let state = Arc::new(AppState::from_config(&config));
    let router = create_router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    info!(addr = %config.server.bind_addr, "Courtside listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("Courtside stopped");

    Ok(())
}
