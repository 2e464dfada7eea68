//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{FileBackend, LocalStorageAdapter, MemoryBackend, OpenAiJokeAdapter},
    config::{Config, StorageBackendKind},
    error::ApiError,
    web::{routes, ApiDoc, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use aussie_joke_core::{AppController, StorageService};
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
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

    // --- 2. Open the Local Store ---
    let storage: Arc<dyn StorageService> = match config.storage_backend {
        StorageBackendKind::File => {
            let backend = FileBackend::new(config.data_dir.clone());
            info!("Keeping the session and joke library in {}", backend.dir().display());
            Arc::new(LocalStorageAdapter::new(backend))
        }
        StorageBackendKind::Memory => {
            info!("Using in-memory storage; nothing survives a restart");
            Arc::new(LocalStorageAdapter::new(MemoryBackend::new()))
        }
    };

    // --- 3. Initialize the Joke Source ---
    let openai_config = OpenAIConfig::new()
        .with_api_key(config.joke_api_key()?)
        .with_api_base(config.joke_api_base.clone());
    let jokes = Arc::new(OpenAiJokeAdapter::new(
        Client::with_config(openai_config),
        config.joke_model.clone(),
    ));
    info!("Jokes come from model '{}' at {}", config.joke_model, config.joke_api_base);

    // --- 4. Restore the Session & Build the Shared AppState ---
    let controller = AppController::start(storage, jokes).await?;
    let app_state = Arc::new(AppState {
        controller: Arc::new(controller),
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = routes().layer(cors).with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
