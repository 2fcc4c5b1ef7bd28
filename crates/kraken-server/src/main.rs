mod configuration;
mod error;
mod routes;
mod state;

use anyhow::Context;
use configuration::Settings;
use dotenv::dotenv;
use kraken::property_data::PropertyDataClient;
use kraken::providers::factory;
use state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    // A local .env is optional
    if let Ok(path) = dotenv() {
        info!("loaded environment from {:?}", path);
    }

    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    let addr = settings
        .server
        .socket_addr()
        .context("server host and port do not form a socket address")?;

    let provider = factory::get_provider(settings.provider.into_config())?;
    let property_data = PropertyDataClient::new(settings.property_data.into_config())?;
    let state = AppState::new(provider, property_data);

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
