use api_server::{build_state, create_router, init_tracing};
use config_manager::SystemConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info,api_server=debug");

    info!("Starting Item Valuer API Server...");

    let config = SystemConfig::load()?;
    info!("Configuration loaded successfully");

    if !config.ebay.has_credentials() {
        info!("eBay credentials not set - /api/comps and /api/valuate will fail until they are");
    }
    if config.gemini.api_key.is_empty() {
        info!("Gemini API key not set - /api/identify and /api/valuate will fail until it is");
    }

    let state = build_state(config.clone())?;
    let app = create_router(state);

    info!("📋 Available endpoints:");
    info!("   • POST /api/identify - Identify the item in a photo");
    info!("   • POST /api/comps - Sold comparables for a search query");
    info!("   • POST /api/valuate - Photo to price in one call");
    info!("   • GET /health - Health check");

    let bind_addr = format!("{}:{}", config.api.host, config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
