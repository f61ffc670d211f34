//! Main entry point for the Prompt Sherlock analysis service

use prompt_sherlock::{api, config::Settings, inference::gemini::GeminiBackend, AppState};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load()?;
    settings.validate()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    if settings.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }

    info!(
        host = %settings.server.host,
        port = settings.server.port,
        environment = %settings.server.environment,
        model = %settings.inference.model,
        "Starting Prompt Sherlock"
    );

    if settings.inference.api_key.is_empty() {
        warn!("No inference API key configured; analysis requests will fail with SERVICE_UNAVAILABLE");
    }

    let backend = Arc::new(GeminiBackend::new(&settings.inference)?);
    let addr = format!("{}:{}", settings.server.host, settings.server.port);

    let app_state = Arc::new(AppState::new(settings, backend));
    app_state.store.ensure_storage_dir().await?;

    let app = api::routes::create_router(app_state.clone());

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
