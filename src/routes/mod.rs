/// Application routes configuration
use crate::handlers::{
    clear_cache, get_airport_traffic, get_delay_analysis, get_live_map, get_overview, health,
    list_airports, refresh_live, search_flights, AppState,
};
use axum::{routing::get, Router};

/// Build the application router with all routes
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health))
        // Live telemetry views
        .route("/overview", get(get_overview))
        .route("/delay", get(get_delay_analysis))
        .route("/live", get(get_live_map))
        .route("/refresh", get(refresh_live))
        .route("/cache/clear", get(clear_cache))
        .route("/flights/search", get(search_flights))
        // Airport explorer
        .route("/airports", get(list_airports))
        .route("/airports/:iata/nearby", get(get_airport_traffic))
        .with_state(state)
}
