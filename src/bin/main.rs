use banking_assistant::{
    commands::CommandRouter,
    config::Config,
    dispatcher::Dispatcher,
    gemini::GeminiClient,
    store::SqliteRecordStore,
    transport::{self, TelegramTransport},
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
    let token = config.telegram_token()?.to_string();

    info!("IceCash assistant starting");
    info!(model = %config.gemini_model, database = %config.database_url, "Configuration loaded");

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
    let router = CommandRouter::new(store, dispatcher);
    let telegram = TelegramTransport::new(&token)?;

    info!("Polling Telegram for messages");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    transport::run(&telegram, &router, shutdown).await?;

    info!("Assistant stopped");
    Ok(())
}
