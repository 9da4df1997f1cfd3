/// HTTP request handlers, one per dashboard view
use crate::config::ViewTtls;
use crate::domain::{Airport, Health, NearbyAircraft, Region};
use crate::errors::{ApiError, ApiResult};
use crate::services::{
    nearest_first, AirportService, FlightFilter, GroundStatus, LiveTrafficService, Proximity,
    TrafficView, ViewQuery,
};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub traffic: Arc<LiveTrafficService>,
    pub airports: Arc<AirportService>,
    pub ttls: ViewTtls,
    pub airport_radius_deg: f64,
}

/// Successful response wrapper
#[derive(Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub ok: bool,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self { ok: true, data }
    }
}

/// Optional bounding-box override and cache bypass, shared by all live views
#[derive(Debug, Default, Deserialize)]
pub struct RegionParams {
    pub lamin: Option<f64>,
    pub lamax: Option<f64>,
    pub lomin: Option<f64>,
    pub lomax: Option<f64>,
    #[serde(default)]
    pub refresh: bool,
}

impl RegionParams {
    /// Missing bounds fall back to the default region
    pub fn resolve(&self, default: Region) -> ApiResult<Region> {
        let region = Region::new(
            self.lamin.unwrap_or(default.lamin),
            self.lamax.unwrap_or(default.lamax),
            self.lomin.unwrap_or(default.lomin),
            self.lomax.unwrap_or(default.lomax),
        );
        if !region.is_valid() {
            return Err(ApiError::InvalidInput(format!(
                "invalid bounding box {},{} / {},{}",
                region.lamin, region.lamax, region.lomin, region.lomax
            )));
        }
        Ok(region)
    }
}

async fn load_view(
    state: &AppState,
    params: &RegionParams,
    ttl: Duration,
    near: Option<Proximity>,
) -> ApiResult<TrafficView> {
    let region = params.resolve(state.traffic.default_region())?;
    let ttl = if params.refresh { Duration::ZERO } else { ttl };
    Ok(state.traffic.view(&ViewQuery { region, ttl, near }).await)
}

/// Health check handler
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        now: Utc::now(),
    })
}

/// Live traffic KPIs for the region
pub async fn get_overview(
    Query(params): Query<RegionParams>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<TrafficView>>> {
    let view = load_view(&state, &params, state.ttls.overview, None).await?;
    Ok(Json(SuccessResponse::new(view)))
}

#[derive(Serialize)]
pub struct DelayReport {
    #[serde(flatten)]
    pub view: TrafficView,
    pub advisory: Option<&'static str>,
}

/// Delay-risk indicators derived from speed, altitude and ground state
pub async fn get_delay_analysis(
    Query(params): Query<RegionParams>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<DelayReport>>> {
    let view = load_view(&state, &params, state.ttls.overview, None).await?;
    let advisory = view.metrics.as_ref().map(|m| m.risk.advisory());
    Ok(Json(SuccessResponse::new(DelayReport { view, advisory })))
}

/// Aircraft positions for the live map
pub async fn get_live_map(
    Query(params): Query<RegionParams>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<TrafficView>>> {
    let view = load_view(&state, &params, state.ttls.live, None).await?;
    Ok(Json(SuccessResponse::new(view)))
}

/// Invalidate the region and fetch it again
pub async fn refresh_live(
    Query(params): Query<RegionParams>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<TrafficView>>> {
    let region = params.resolve(state.traffic.default_region())?;
    let view = state.traffic.refresh(&region).await;
    Ok(Json(SuccessResponse::new(view)))
}

#[derive(Serialize)]
pub struct Cleared {
    pub cleared: bool,
}

/// Invalidate every cached snapshot
pub async fn clear_cache(State(state): State<AppState>) -> Json<SuccessResponse<Cleared>> {
    state.traffic.clear_cache();
    Json(SuccessResponse::new(Cleared { cleared: true }))
}

#[derive(Debug, Deserialize)]
pub struct AirportListParams {
    pub country: Option<String>,
}

#[derive(Serialize)]
pub struct AirportList {
    pub airports: Vec<Airport>,
}

/// Reference airports of a country
pub async fn list_airports(
    Query(params): Query<AirportListParams>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<AirportList>>> {
    let country = params.country.as_deref().unwrap_or("India");
    let airports = state.airports.list(country).await?;
    Ok(Json(SuccessResponse::new(AirportList { airports })))
}

#[derive(Serialize)]
pub struct AirportTraffic {
    pub airport: Airport,
    pub radius_deg: f64,
    #[serde(flatten)]
    pub view: TrafficView,
    pub nearby: Vec<NearbyAircraft>,
}

/// Live aircraft within the degree window around an airport
pub async fn get_airport_traffic(
    Path(iata): Path<String>,
    Query(params): Query<RegionParams>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<AirportTraffic>>> {
    let airport = state.airports.find(&iata).await?;
    let near = Proximity {
        center: airport.position(),
        radius_deg: state.airport_radius_deg,
    };
    let mut view = load_view(&state, &params, state.ttls.overview, Some(near)).await?;
    let nearby = nearest_first(&view.records, near.center);
    view.records.clear();

    Ok(Json(SuccessResponse::new(AirportTraffic {
        airport,
        radius_deg: near.radius_deg,
        view,
        nearby,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub callsign: Option<String>,
    pub country: Option<String>,
    pub status: Option<GroundStatus>,
}

impl SearchParams {
    fn filter(&self) -> FlightFilter {
        let non_empty = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        FlightFilter {
            callsign: non_empty(&self.callsign),
            country: non_empty(&self.country),
            status: self.status,
        }
    }
}

/// Live flights matching callsign, country and ground status
pub async fn search_flights(
    Query(params): Query<SearchParams>,
    Query(bounds): Query<RegionParams>,
    State(state): State<AppState>,
) -> ApiResult<Json<SuccessResponse<TrafficView>>> {
    let region = bounds.resolve(state.traffic.default_region())?;
    let ttl = if bounds.refresh {
        Duration::ZERO
    } else {
        state.ttls.live
    };
    let query = ViewQuery {
        region,
        ttl,
        near: None,
    };
    let view = state.traffic.search(&query, &params.filter()).await;
    Ok(Json(SuccessResponse::new(view)))
}
