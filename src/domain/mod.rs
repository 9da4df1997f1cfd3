/// Domain models for the application
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const MPS_TO_KMH: f64 = 3.6;
const M_TO_FT: f64 = 3.28084;

/// Bounding box of a telemetry query, in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub lamin: f64,
    pub lamax: f64,
    pub lomin: f64,
    pub lomax: f64,
}

impl Region {
    pub const INDIA: Region = Region {
        lamin: 6.0,
        lamax: 35.0,
        lomin: 68.0,
        lomax: 97.0,
    };

    pub fn new(lamin: f64, lamax: f64, lomin: f64, lomax: f64) -> Self {
        Self {
            lamin,
            lamax,
            lomin,
            lomax,
        }
    }

    /// Canonical cache key; bounds are rounded to 4 decimals so that
    /// equivalent float spellings map to the same entry
    pub fn key(&self) -> RegionKey {
        RegionKey(format!(
            "{:.4},{:.4},{:.4},{:.4}",
            self.lamin, self.lamax, self.lomin, self.lomax
        ))
    }

    pub fn is_valid(&self) -> bool {
        [self.lamin, self.lamax, self.lomin, self.lomax]
            .iter()
            .all(|v| v.is_finite())
            && self.lamin <= self.lamax
            && self.lomin <= self.lomax
            && (-90.0..=90.0).contains(&self.lamin)
            && (-90.0..=90.0).contains(&self.lamax)
            && (-180.0..=180.0).contains(&self.lomin)
            && (-180.0..=180.0).contains(&self.lomax)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RegionKey(String);

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Origin of a state vector position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSource {
    AdsB,
    Asterix,
    Mlat,
    Flarm,
    Unknown,
}

impl From<i64> for PositionSource {
    fn from(code: i64) -> Self {
        match code {
            0 => PositionSource::AdsB,
            1 => PositionSource::Asterix,
            2 => PositionSource::Mlat,
            3 => PositionSource::Flarm,
            _ => PositionSource::Unknown,
        }
    }
}

/// One aircraft's instantaneous state, SI units as delivered by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub icao24: String,
    pub callsign: Option<String>,
    pub origin_country: String,
    pub time_position: Option<i64>,
    pub last_contact: Option<i64>,
    pub longitude: f64,
    pub latitude: f64,
    pub baro_altitude_m: Option<f64>,
    pub geo_altitude_m: Option<f64>,
    pub on_ground: bool,
    pub velocity_mps: Option<f64>,
    pub true_track_deg: Option<f64>,
    pub vertical_rate_mps: Option<f64>,
    pub squawk: Option<String>,
    pub spi: bool,
    pub position_source: PositionSource,
}

impl StateRecord {
    pub fn speed_kmh(&self) -> Option<f64> {
        self.velocity_mps.map(|v| v * MPS_TO_KMH)
    }

    /// Geometric altitude in feet
    pub fn altitude_ft(&self) -> Option<f64> {
        self.geo_altitude_m.map(|a| a * M_TO_FT)
    }
}

/// Provider payload before normalization
#[derive(Debug, Clone, Deserialize)]
pub struct RawSnapshot {
    pub time: i64,
    #[serde(default)]
    pub states: Option<Vec<serde_json::Value>>,
}

/// One timestamped batch of normalized records for a region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub time: i64,
    pub region: Region,
    pub records: Vec<StateRecord>,
}

impl Snapshot {
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.time, 0).single()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl RiskCategory {
    pub fn advisory(&self) -> &'static str {
        match self {
            RiskCategory::High => "High congestion detected, potential delays likely.",
            RiskCategory::Moderate => "Moderate congestion, monitor operations.",
            RiskCategory::Low => "Low congestion, operations normal.",
        }
    }
}

/// Derived KPIs for a set of records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsResult {
    pub total: usize,
    pub grounded: usize,
    pub slow: usize,
    pub low_altitude: usize,
    pub avg_speed_kmh: Option<f64>,
    pub avg_altitude_ft: Option<f64>,
    pub congestion_score: f64,
    pub risk: RiskCategory,
}

/// A record annotated with its great-circle distance to a reference point
#[derive(Debug, Clone, Serialize)]
pub struct NearbyAircraft {
    #[serde(flatten)]
    pub record: StateRecord,
    pub distance_km: f64,
}

/// Freshness of the data handed to a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    Ok,
    Stale,
    Unavailable,
}

/// Reference airport from the static store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub iata_code: Option<String>,
    pub name: String,
    pub city: Option<String>,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Airport {
    pub fn position(&self) -> GeoPoint {
        GeoPoint {
            lat: self.latitude,
            lon: self.longitude,
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct Health {
    pub status: &'static str,
    pub now: DateTime<Utc>,
}
