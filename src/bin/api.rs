use banking_assistant::{
    api::start_server, commands::CommandRouter, config::Config, dispatcher::Dispatcher,
    gemini::GeminiClient, store::SqliteRecordStore,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = Config::from_env()?;

    info!("🚀 IceCash assistant - API Server");
    info!("📍 Port: {}", config.api_port);

    // Create components
    let store = Arc::new(SqliteRecordStore::connect(&config.database_url).await?);
    if config.seed_demo_data {
        warn!("SEED_DEMO_DATA is set, recreating tables with demo records");
        store.seed_demo_data().await?;
    }

    let generator = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.generation_timeout,
    )?);

    let dispatcher = Arc::new(Dispatcher::new(store.clone(), generator));
    let router = Arc::new(CommandRouter::new(store, dispatcher));

    info!("✅ Assistant initialized");
    info!("📡 Starting API server...");

    // Start API server
    start_server(router, config.api_port).await?;

    Ok(())
}
