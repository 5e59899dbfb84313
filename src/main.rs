use anyhow::Context;
use personality_api::app;
use personality_api::classifier::{Classifier, LoadedModel};
use personality_api::config::Config;
use personality_api::handlers::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Model loading (fatal on failure, before the listener binds).
/// - HTTP routes and middleware (CORS, body limits, rate limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "personality_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Load the model once; the service never starts without it
    let model = LoadedModel::load(&config.model_path, config.model_sha256.as_deref())
        .with_context(|| format!("failed to load model from {}", config.model_path.display()))?;
    let classifier: Arc<dyn Classifier> = Arc::new(model);
    tracing::info!("Model ready: {}", classifier.describe());

    let app_state = Arc::new(AppState::new(classifier, config.clone()));

    // Health and root bypass rate limiting
    let prediction = app::rate_limited(app::prediction_routes(&config), &config)?;
    let router = app::router(app_state, prediction);

    // Start server
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
