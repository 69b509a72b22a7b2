//! services/api/src/bin/api.rs

use api_lib::{
    adapters::GatewayChatAdapter,
    config::Config,
    error::ApiError,
    web::{create_router, rest::ApiDoc, state::AppState},
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    if config.gateway_api_key.is_none() {
        // Startup still succeeds; each assistant call will report the
        // missing credential as a service error.
        tracing::warn!("AI_GATEWAY_API_KEY is not configured. Assistant requests will fail.");
    }

    // --- 2. Initialize the Assistant Adapter ---
    let assistant = Arc::new(GatewayChatAdapter::new(
        config.gateway_url.clone(),
        config.gateway_api_key.clone(),
        config.chat_model.clone(),
        config.upstream_timeout,
    )?);

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        assistant,
    });

    // --- 4. Create the Web Router ---
    // Merge the relay router with the Swagger UI router for a complete application.
    let app = create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
