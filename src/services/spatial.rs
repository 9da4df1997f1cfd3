//! Degree-window proximity filter.
//!
//! The window is a lat/lon box, not a geodesic radius: one degree of
//! longitude shrinks towards the poles.
use crate::domain::{GeoPoint, StateRecord};

pub fn is_within(record: &StateRecord, center: GeoPoint, radius_deg: f64) -> bool {
    (center.lat - radius_deg..=center.lat + radius_deg).contains(&record.latitude)
        && (center.lon - radius_deg..=center.lon + radius_deg).contains(&record.longitude)
}

/// Records inside the inclusive window around `center`, in input order
pub fn within(records: &[StateRecord], center: GeoPoint, radius_deg: f64) -> Vec<StateRecord> {
    records
        .iter()
        .filter(|r| is_within(r, center, radius_deg))
        .cloned()
        .collect()
}
