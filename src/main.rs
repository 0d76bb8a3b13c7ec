use mpesa_stk_relay::{
    api::{self, AppState},
    config::Config,
    logging::{self, LogFormat},
    payments::providers::MpesaProvider,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_tracing(LogFormat::from_env());

    // Load configuration
    let config = Config::from_env()?;

    // Log startup info
    tracing::info!("Starting M-Pesa STK push relay");
    tracing::info!("M-Pesa environment: {}", config.mpesa.environment);
    tracing::info!("Business shortcode: {}", config.mpesa.shortcode);
    tracing::info!("Transaction type: {}", config.mpesa.transaction_type);
    tracing::info!("Token caching: {}", config.mpesa.cache_token);

    let provider = MpesaProvider::new(config.mpesa.clone())?;

    // Build router
    let app = api::router(AppState::new(Arc::new(provider)));

    // Start server
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    tracing::info!("Server is running on http://{}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
