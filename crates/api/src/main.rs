use std::env;

use aero_api::{build_app, ApiConfig};
use aero_observability::init_tracing;
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("aero_api");

    let bind = env::var("AERO_BIND").unwrap_or_else(|_| "0.0.0.0:5002".to_string());
    let config = ApiConfig::from_env();
    let intents = config.app.intents_path.display().to_string();

    let app = build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, intents = %intents, "airline assistant api started");

    axum::serve(listener, app).await?;
    Ok(())
}
