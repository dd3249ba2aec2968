use anyhow::Result;
use flood_engine::engine::Collaborators;
use flood_engine::providers::{live_collaborators, ProviderConfig};
use flood_engine::{EngineConfig, FloodEngine};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod overlay;
mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "flood_gateway=debug,flood_engine=info,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();
    let offline = std::env::var("FLOOD_OFFLINE").map(|v| v == "1").unwrap_or(false);

    let sources = if offline {
        tracing::warn!("   FLOOD_OFFLINE=1: every stage will answer from fallback data");
        Collaborators::offline()
    } else {
        let providers = ProviderConfig::from_env();
        if providers.mapbox_token.is_none() {
            tracing::warn!("   MAPBOX_TOKEN not set: elevation, water, places and directions will fall back");
        }
        live_collaborators(&providers)?
    };

    let engine = FloodEngine::new(config, sources)?;
    tracing::info!(
        "   Discovery limit {}, {} concurrent lookups, occupancy seed {:?}",
        engine.config().discovery_limit,
        engine.config().max_concurrent_lookups,
        engine.config().occupancy_seed
    );

    let app = routes::router(AppState {
        engine: Arc::new(engine),
    });

    let port = std::env::var("FLOOD_GATEWAY_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "18700".to_string());
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("Flood Gateway starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
