//! Heuristic delay-risk indicators derived from kinematic state.
use crate::domain::{MetricsResult, RiskCategory, StateRecord};
use crate::utils::round1;

/// Below this speed an aircraft counts as slow
pub const SLOW_SPEED_KMH: f64 = 150.0;
/// Below this altitude an aircraft counts as low
pub const LOW_ALTITUDE_FT: f64 = 3000.0;

const HIGH_RISK_ABOVE: f64 = 60.0;
const MODERATE_RISK_ABOVE: f64 = 35.0;

fn is_slow(r: &StateRecord) -> bool {
    r.speed_kmh().is_some_and(|v| v < SLOW_SPEED_KMH)
}

fn is_low(r: &StateRecord) -> bool {
    r.altitude_ft().is_some_and(|a| a < LOW_ALTITUDE_FT)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

pub fn risk_category(congestion_score: f64) -> RiskCategory {
    if congestion_score > HIGH_RISK_ABOVE {
        RiskCategory::High
    } else if congestion_score > MODERATE_RISK_ABOVE {
        RiskCategory::Moderate
    } else {
        RiskCategory::Low
    }
}

/// Compute the KPIs for a snapshot or a filtered subset of it.
///
/// The congestion score counts each aircraft once even if it is both
/// grounded and slow, which keeps it within [0, 100].
pub fn compute(records: &[StateRecord]) -> MetricsResult {
    let total = records.len();
    let grounded = records.iter().filter(|r| r.on_ground).count();
    let slow = records.iter().filter(|r| is_slow(r)).count();
    let low_altitude = records.iter().filter(|r| is_low(r)).count();
    let congested = records.iter().filter(|r| r.on_ground || is_slow(r)).count();

    let congestion_score = round1(100.0 * congested as f64 / total.max(1) as f64);

    MetricsResult {
        total,
        grounded,
        slow,
        low_altitude,
        avg_speed_kmh: mean(records.iter().filter_map(StateRecord::speed_kmh)),
        avg_altitude_ft: mean(records.iter().filter_map(StateRecord::altitude_ft)),
        congestion_score,
        risk: risk_category(congestion_score),
    }
}
