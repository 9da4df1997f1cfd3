/// Live air traffic service: telemetry ingestion, caching and delay-risk views
mod clients;
mod config;
mod domain;
mod errors;
mod handlers;
mod repo;
mod routes;
mod services;
mod utils;

use crate::clients::OpenSkyClient;
use crate::config::AppConfig;
use crate::domain::DataStatus;
use crate::handlers::AppState;
use crate::repo::AirportRepo;
use crate::routes::build_router;
use crate::services::cache::SnapshotCache;
use crate::services::{AirportService, LiveTrafficService};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    // Load configuration
    let config = AppConfig::from_env()?;
    info!("Configuration loaded successfully");

    // Reference store is optional; the pool connects on first use
    let airport_repo = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect_lazy(url)?;
            info!("Airport reference store configured");
            Some(AirportRepo::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, airport endpoints are disabled");
            None
        }
    };

    // Initialize telemetry client and engine
    let client = OpenSkyClient::new(config.opensky_url.clone(), config.fetch_timeout)?;
    info!("Telemetry source: {}", client.base_url());
    let cache = SnapshotCache::new(Arc::new(client), config.fetch_timeout)
        .with_retention(config.cache_retention);
    let traffic = Arc::new(LiveTrafficService::new(cache, config.default_region));

    // Initialize application state
    let state = AppState {
        traffic: traffic.clone(),
        airports: Arc::new(AirportService::new(airport_repo)),
        ttls: config.ttls.clone(),
        airport_radius_deg: config.airport_radius_deg,
    };

    if let Some(every) = config.refresh_every {
        start_warmup_task(traffic, every);
    }

    // Build router
    let app = build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("aero_live service listening on {}", config.bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Keep the default region's cache entry warm
fn start_warmup_task(traffic: Arc<LiveTrafficService>, every: Duration) {
    tokio::spawn(async move {
        info!("Starting cache warm-up task (interval: {}s)", every.as_secs());
        loop {
            let region = traffic.default_region();
            let view = traffic.refresh(&region).await;
            if view.status != DataStatus::Ok {
                warn!("Warm-up refresh for {} returned {:?}", region.key(), view.status);
            }
            tokio::time::sleep(every).await;
        }
    });
}
