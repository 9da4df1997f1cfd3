//! Maps the provider's positional state vectors onto [`StateRecord`].
use crate::domain::{PositionSource, RawSnapshot, Region, Snapshot, StateRecord};
use crate::utils::{int, num, text};
use serde_json::Value;
use tracing::debug;

// Positions in the provider's 17-element state vector
const ICAO24: usize = 0;
const CALLSIGN: usize = 1;
const ORIGIN_COUNTRY: usize = 2;
const TIME_POSITION: usize = 3;
const LAST_CONTACT: usize = 4;
const LONGITUDE: usize = 5;
const LATITUDE: usize = 6;
const BARO_ALTITUDE: usize = 7;
const ON_GROUND: usize = 8;
const VELOCITY: usize = 9;
const TRUE_TRACK: usize = 10;
const VERTICAL_RATE: usize = 11;
const GEO_ALTITUDE: usize = 13;
const SQUAWK: usize = 14;
const SPI: usize = 15;
const POSITION_SOURCE: usize = 16;

/// Normalize one raw state vector. Returns `None` for vectors without a
/// position or an icao24 identifier.
pub fn normalize_record(raw: &Value) -> Option<StateRecord> {
    let fields = raw.as_array()?;
    let at = |i: usize| fields.get(i).unwrap_or(&Value::Null);

    let icao24 = text(at(ICAO24))?;
    let longitude = num(at(LONGITUDE)).filter(|v| v.is_finite())?;
    let latitude = num(at(LATITUDE)).filter(|v| v.is_finite())?;

    Some(StateRecord {
        icao24,
        callsign: text(at(CALLSIGN)),
        origin_country: text(at(ORIGIN_COUNTRY)).unwrap_or_default(),
        time_position: int(at(TIME_POSITION)),
        last_contact: int(at(LAST_CONTACT)),
        longitude,
        latitude,
        baro_altitude_m: num(at(BARO_ALTITUDE)),
        geo_altitude_m: num(at(GEO_ALTITUDE)),
        on_ground: at(ON_GROUND).as_bool().unwrap_or(false),
        velocity_mps: num(at(VELOCITY)),
        true_track_deg: num(at(TRUE_TRACK)),
        vertical_rate_mps: num(at(VERTICAL_RATE)),
        squawk: text(at(SQUAWK)),
        spi: at(SPI).as_bool().unwrap_or(false),
        position_source: int(at(POSITION_SOURCE))
            .map(PositionSource::from)
            .unwrap_or(PositionSource::Unknown),
    })
}

/// Normalize a whole provider response; order of surviving records is kept
pub fn normalize_snapshot(raw: RawSnapshot, region: Region) -> Snapshot {
    let states = raw.states.unwrap_or_default();
    let received = states.len();
    let records: Vec<StateRecord> = states.iter().filter_map(normalize_record).collect();

    if records.len() < received {
        debug!(
            "Dropped {} of {} state vectors without position",
            received - records.len(),
            received
        );
    }

    Snapshot {
        time: raw.time,
        region,
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vector(icao: &str, lon: Value, lat: Value) -> Value {
        json!([
            icao, "IGO6E21 ", "India", 1705315790, 1705315799, lon, lat, 3048.0, false, 41.6667,
            270.0, -2.5, null, 3100.0, "7421", false, 2
        ])
    }

    #[test]
    fn test_full_vector_is_mapped() {
        let rec = normalize_record(&vector("800c1b", json!(72.87), json!(19.09))).unwrap();
        assert_eq!(rec.icao24, "800c1b");
        assert_eq!(rec.callsign.as_deref(), Some("IGO6E21"));
        assert_eq!(rec.origin_country, "India");
        assert_eq!(rec.time_position, Some(1705315790));
        assert_eq!(rec.longitude, 72.87);
        assert_eq!(rec.latitude, 19.09);
        assert_eq!(rec.baro_altitude_m, Some(3048.0));
        assert_eq!(rec.geo_altitude_m, Some(3100.0));
        assert!(!rec.on_ground);
        assert_eq!(rec.vertical_rate_mps, Some(-2.5));
        assert_eq!(rec.squawk.as_deref(), Some("7421"));
        assert_eq!(rec.position_source, PositionSource::Mlat);
        assert!((rec.speed_kmh().unwrap() - 150.0).abs() < 0.01);
    }

    #[test]
    fn test_missing_coordinates_are_dropped() {
        assert!(normalize_record(&vector("a", Value::Null, json!(19.0))).is_none());
        assert!(normalize_record(&vector("b", json!(72.0), Value::Null)).is_none());
    }

    #[test]
    fn test_blank_callsign_becomes_none() {
        let mut v = vector("800c1b", json!(72.87), json!(19.09));
        v[1] = json!("        ");
        assert_eq!(normalize_record(&v).unwrap().callsign, None);
        v[1] = Value::Null;
        assert_eq!(normalize_record(&v).unwrap().callsign, None);
    }

    #[test]
    fn test_short_and_invalid_vectors() {
        let short = json!(["800c1b", null, "India", null, null, 72.0, 19.0]);
        let rec = normalize_record(&short).unwrap();
        assert_eq!(rec.velocity_mps, None);
        assert_eq!(rec.position_source, PositionSource::Unknown);

        assert!(normalize_record(&json!({"icao24": "800c1b"})).is_none());
        assert!(normalize_record(&json!([null, null, "India", null, null, 72.0, 19.0])).is_none());
    }

    #[test]
    fn test_snapshot_keeps_only_positioned_records() {
        let raw = RawSnapshot {
            time: 1705315800,
            states: Some(vec![
                vector("a", json!(72.0), json!(19.0)),
                vector("b", Value::Null, json!(19.0)),
                vector("c", json!(77.0), json!(28.0)),
                vector("d", json!(77.0), Value::Null),
            ]),
        };
        let snap = normalize_snapshot(raw, Region::INDIA);
        let ids: Vec<&str> = snap.records.iter().map(|r| r.icao24.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(snap.time, 1705315800);
    }

    #[test]
    fn test_null_states_is_empty_snapshot() {
        let raw = RawSnapshot {
            time: 1705315800,
            states: None,
        };
        let snap = normalize_snapshot(raw, Region::INDIA);
        assert!(snap.is_empty());
        assert_eq!(snap.region, Region::INDIA);
    }
}
