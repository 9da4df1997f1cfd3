/// Business logic services layer
pub mod cache;
pub mod metrics;
pub mod normalize;
pub mod spatial;
#[cfg(test)]
pub(crate) mod testing;

use crate::domain::{
    Airport, DataStatus, GeoPoint, MetricsResult, NearbyAircraft, Region, StateRecord,
};
use crate::errors::{ApiError, ApiResult};
use crate::repo::AirportRepo;
use crate::utils::haversine_km;
use cache::{CacheLookup, FetchFailure, SnapshotCache};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Degree window around a reference point
#[derive(Debug, Clone, Copy)]
pub struct Proximity {
    pub center: GeoPoint,
    pub radius_deg: f64,
}

/// What a display view asks the engine for
#[derive(Debug, Clone, Copy)]
pub struct ViewQuery {
    pub region: Region,
    pub ttl: Duration,
    pub near: Option<Proximity>,
}

/// Snapshot-or-unavailable plus metrics-or-undefined, ready for rendering
#[derive(Debug, Serialize)]
pub struct TrafficView {
    pub status: DataStatus,
    pub region: Region,
    pub provider_time: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_for_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FetchFailure>,
    pub metrics: Option<MetricsResult>,
    pub records: Vec<StateRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundStatus {
    Airborne,
    OnGround,
}

/// Live flight search criteria, all optional
#[derive(Debug, Clone, Default)]
pub struct FlightFilter {
    /// Case-insensitive substring of the callsign
    pub callsign: Option<String>,
    /// Exact origin country
    pub country: Option<String>,
    pub status: Option<GroundStatus>,
}

impl FlightFilter {
    pub fn matches(&self, record: &StateRecord) -> bool {
        if let Some(needle) = self.callsign.as_deref() {
            let needle = needle.to_lowercase();
            match record.callsign.as_deref() {
                Some(cs) if cs.to_lowercase().contains(&needle) => {}
                _ => return false,
            }
        }
        if let Some(country) = self.country.as_deref() {
            if record.origin_country != country {
                return false;
            }
        }
        match self.status {
            Some(GroundStatus::Airborne) => !record.on_ground,
            Some(GroundStatus::OnGround) => record.on_ground,
            None => true,
        }
    }
}

/// Live telemetry engine shared by all display views
pub struct LiveTrafficService {
    cache: SnapshotCache,
    default_region: Region,
}

impl LiveTrafficService {
    pub fn new(cache: SnapshotCache, default_region: Region) -> Self {
        Self {
            cache,
            default_region,
        }
    }

    pub fn default_region(&self) -> Region {
        self.default_region
    }

    /// Fetch (or reuse) the region snapshot, optionally narrow it to a
    /// proximity window, and score it
    pub async fn view(&self, query: &ViewQuery) -> TrafficView {
        self.view_filtered(query, |_| true).await
    }

    /// Like [`view`](Self::view) but keeps only records matching `filter`
    pub async fn search(&self, query: &ViewQuery, filter: &FlightFilter) -> TrafficView {
        self.view_filtered(query, |r| filter.matches(r)).await
    }

    async fn view_filtered<F>(&self, query: &ViewQuery, keep: F) -> TrafficView
    where
        F: Fn(&StateRecord) -> bool,
    {
        let lookup = self.cache.get_or_fetch(&query.region, query.ttl).await;

        let (status, stale_for, failure) = match &lookup {
            CacheLookup::Fresh(_) => (DataStatus::Ok, None, None),
            CacheLookup::Stale { age, failure, .. } => {
                (DataStatus::Stale, Some(age.as_secs()), Some(failure.clone()))
            }
            CacheLookup::Unavailable(failure) => {
                (DataStatus::Unavailable, None, Some(failure.clone()))
            }
        };

        let Some(snapshot) = lookup.snapshot() else {
            return TrafficView {
                status,
                region: query.region,
                provider_time: None,
                updated_at: None,
                stale_for_seconds: None,
                failure,
                metrics: None,
                records: Vec::new(),
            };
        };

        let records: Vec<StateRecord> = match query.near {
            Some(p) => spatial::within(&snapshot.records, p.center, p.radius_deg),
            None => snapshot.records.clone(),
        }
        .into_iter()
        .filter(|r| keep(r))
        .collect();

        TrafficView {
            status,
            region: snapshot.region,
            provider_time: Some(snapshot.time),
            updated_at: snapshot.updated_at(),
            stale_for_seconds: stale_for,
            failure,
            metrics: Some(metrics::compute(&records)),
            records,
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop freshness of `region` and fetch it again
    pub async fn refresh(&self, region: &Region) -> TrafficView {
        self.cache.invalidate(&region.key());
        self.view(&ViewQuery {
            region: *region,
            ttl: Duration::ZERO,
            near: None,
        })
        .await
    }
}

/// Great-circle distance of each record to `center`, nearest first
pub fn nearest_first(records: &[StateRecord], center: GeoPoint) -> Vec<NearbyAircraft> {
    let mut nearby: Vec<NearbyAircraft> = records
        .iter()
        .map(|r| NearbyAircraft {
            distance_km: haversine_km(center.lat, center.lon, r.latitude, r.longitude),
            record: r.clone(),
        })
        .collect();
    nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    nearby
}

/// Read-only access to the airport reference store
pub struct AirportService {
    repo: Option<AirportRepo>,
}

impl AirportService {
    pub fn new(repo: Option<AirportRepo>) -> Self {
        Self { repo }
    }

    fn repo(&self) -> ApiResult<&AirportRepo> {
        self.repo
            .as_ref()
            .ok_or_else(|| {
                ApiError::NotFound("airport reference store not configured".to_string())
            })
    }

    pub async fn list(&self, country: &str) -> ApiResult<Vec<Airport>> {
        self.repo()?.list_by_country(country).await
    }

    pub async fn find(&self, iata: &str) -> ApiResult<Airport> {
        let code = iata.trim().to_uppercase();
        if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ApiError::InvalidInput(format!("not an IATA code: {}", iata)));
        }
        self.repo()?
            .find_by_iata(&code)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("airport {}", code)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RawSnapshot, RiskCategory};
    use crate::errors::FetchError;
    use crate::services::testing::{raw_snapshot, FakeSource};
    use serde_json::{json, Value};
    use std::sync::Arc;

    const TTL: Duration = Duration::from_secs(30);

    fn vector(
        icao: &str,
        callsign: &str,
        country: &str,
        lat: f64,
        lon: f64,
        on_ground: bool,
        v: f64,
    ) -> Value {
        json!([
            icao, callsign, country, null, null, lon, lat, 300.0, on_ground, v, 0.0, 0.0, null,
            300.0, null, false, 0
        ])
    }

    fn fixture() -> Vec<Value> {
        vec![
            vector("a1", "IGO6E21 ", "India", 28.56, 77.10, true, 0.0),
            vector("a2", "AIC101  ", "India", 28.70, 77.30, false, 35.0),
            vector("a3", "BAW143  ", "United Kingdom", 19.09, 72.87, false, 230.0),
            vector("a4", "SEJ8169 ", "India", 13.20, 77.70, false, 220.0),
        ]
    }

    fn service(responses: Vec<Result<RawSnapshot, FetchError>>) -> LiveTrafficService {
        let source = Arc::new(FakeSource::new(responses));
        let cache = SnapshotCache::new(source, Duration::from_secs(10));
        LiveTrafficService::new(cache, Region::INDIA)
    }

    fn query(near: Option<Proximity>) -> ViewQuery {
        ViewQuery {
            region: Region::INDIA,
            ttl: TTL,
            near,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_scores_whole_region() {
        let svc = service(vec![Ok(raw_snapshot(1705315800, fixture()))]);
        let view = svc.view(&query(None)).await;

        assert_eq!(view.status, DataStatus::Ok);
        assert_eq!(view.provider_time, Some(1705315800));
        assert_eq!(view.records.len(), 4);
        let m = view.metrics.unwrap();
        assert_eq!(m.grounded, 1);
        assert_eq!(m.slow, 2);
        assert_eq!(m.congestion_score, 50.0);
        assert_eq!(m.risk, RiskCategory::Moderate);
    }

    #[tokio::test(start_paused = true)]
    async fn test_view_near_reference_point() {
        let svc = service(vec![Ok(raw_snapshot(1705315800, fixture()))]);
        let del = Proximity {
            center: GeoPoint { lat: 28.5562, lon: 77.1 },
            radius_deg: 1.0,
        };
        let view = svc.view(&query(Some(del))).await;

        let ids: Vec<&str> = view.records.iter().map(|r| r.icao24.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
        assert_eq!(view.metrics.unwrap().risk, RiskCategory::High);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_view_has_no_metrics() {
        let svc = service(vec![Err(FetchError::Status(429))]);
        let view = svc.view(&query(None)).await;

        assert_eq!(view.status, DataStatus::Unavailable);
        assert!(view.metrics.is_none());
        assert!(view.records.is_empty());
        assert_eq!(view.failure.unwrap().code, "UPSTREAM_429");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_view_is_flagged() {
        let svc = service(vec![Ok(raw_snapshot(1705315800, fixture()))]);
        svc.view(&query(None)).await;
        tokio::time::advance(Duration::from_secs(40)).await;

        let view = svc.view(&query(None)).await;
        assert_eq!(view.status, DataStatus::Stale);
        assert_eq!(view.stale_for_seconds, Some(40));
        assert_eq!(view.records.len(), 4);
        assert!(view.metrics.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_region_metrics() {
        let svc = service(vec![Ok(raw_snapshot(1705315800, vec![]))]);
        let view = svc.view(&query(None)).await;

        assert_eq!(view.status, DataStatus::Ok);
        let m = view.metrics.unwrap();
        assert_eq!(m.total, 0);
        assert_eq!(m.congestion_score, 0.0);
        assert_eq!(m.avg_speed_kmh, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_refetches() {
        let svc = service(vec![
            Ok(raw_snapshot(100, fixture())),
            Ok(raw_snapshot(110, vec![])),
        ]);
        svc.view(&query(None)).await;
        let view = svc.refresh(&Region::INDIA).await;
        assert_eq!(view.provider_time, Some(110));
        assert!(view.records.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_filters() {
        let svc = service(vec![Ok(raw_snapshot(100, fixture()))]);

        let by_callsign = FlightFilter {
            callsign: Some("6e".to_string()),
            ..Default::default()
        };
        let view = svc.search(&query(None), &by_callsign).await;
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.records[0].icao24, "a1");

        let airborne_indian = FlightFilter {
            country: Some("India".to_string()),
            status: Some(GroundStatus::Airborne),
            ..Default::default()
        };
        let view = svc.search(&query(None), &airborne_indian).await;
        let ids: Vec<&str> = view.records.iter().map(|r| r.icao24.as_str()).collect();
        assert_eq!(ids, vec!["a2", "a4"]);
    }

    #[test]
    fn test_filter_without_callsign_never_matches_callsign_search() {
        let filter = FlightFilter {
            callsign: Some("AI".to_string()),
            ..Default::default()
        };
        let mut rec = crate::services::normalize::normalize_record(&vector(
            "a9", "", "India", 20.0, 78.0, false, 200.0,
        ))
        .unwrap();
        assert!(!filter.matches(&rec));
        rec.callsign = Some("AIC101".to_string());
        assert!(filter.matches(&rec));
        assert!(FlightFilter::default().matches(&rec));
    }

    #[test]
    fn test_nearest_first_orders_by_distance() {
        let records: Vec<StateRecord> = fixture()
            .iter()
            .filter_map(crate::services::normalize::normalize_record)
            .collect();
        let nearby = nearest_first(&records, GeoPoint { lat: 28.5562, lon: 77.1 });
        assert_eq!(nearby[0].record.icao24, "a1");
        assert!(nearby[0].distance_km < 1.0);
        assert!(nearby.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[tokio::test]
    async fn test_airport_lookup_without_store() {
        let airports = AirportService::new(None);
        assert!(matches!(airports.find("DEL").await, Err(ApiError::NotFound(_))));
        assert!(matches!(airports.find("DELHI").await, Err(ApiError::InvalidInput(_))));
        assert!(matches!(airports.list("India").await, Err(ApiError::NotFound(_))));
    }
}
