use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use bus_server::config::{ServerConfig, StoreSource};
use bus_server::distance::DistanceCalculator;
use bus_server::store::{InMemoryStore, RestStore, RouteStore};
use bus_server::web::{AppState, create_router};

const DEFAULT_LOG_FILTER: &str = "bus_server=info,tower_http=info";

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    // Fail fast on bad configuration
    let config = ServerConfig::from_env().expect("Invalid configuration");

    let calculator = DistanceCalculator::with_default_strategies(config.routing.clone())
        .expect("Failed to create routing client");
    info!(
        routing = %config.routing.base_url,
        primary = calculator.primary_name(),
        fallback = calculator.fallback_name(),
        "distance strategies ready"
    );

    match &config.store {
        StoreSource::Rest(rest) => {
            info!(url = %rest.base_url, "using REST data store");
            let store = RestStore::new(rest.clone()).expect("Failed to create store client");
            serve(store, calculator, &config).await;
        }
        StoreSource::Fixture(path) => {
            let store = InMemoryStore::from_json_file(path).expect("Failed to load fixture");
            info!(path = %path.display(), stops = store.stop_count().await, "using fixture data");
            serve(store, calculator, &config).await;
        }
    }
}

async fn serve<S: RouteStore + 'static>(store: S, calculator: DistanceCalculator, config: &ServerConfig) {
    let state = AppState::new(
        Arc::new(store),
        Arc::new(calculator),
        &config.cache,
        config.discovery_radius_m,
    );
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    info!(addr = %config.bind_addr, "Bus trip planner listening");
    info!("  GET  /health");
    info!("  GET  /api/stops/nearby?lat&lon&radius_m");
    info!("  GET  /api/journeys/length?bus_id&direction&boarding&alighting");
    info!("  POST /api/journeys/cache/clear");
    info!("  GET  /api/trips/plan?from_lat&from_lon&to_lat&to_lon&radius_m");
    info!("  GET  /api/distance?from_lat&from_lon&to_lat&to_lon&fallback");

    axum::serve(listener, app).await.expect("Server error");
}
