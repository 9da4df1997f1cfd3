/// Utility functions
use serde_json::Value;

/// Extract number from JSON value
pub fn num(v: &Value) -> Option<f64> {
    if let Some(x) = v.as_f64() {
        return Some(x);
    }
    if let Some(s) = v.as_str() {
        return s.parse::<f64>().ok();
    }
    None
}

/// Extract integer from JSON value, truncating floats
pub fn int(v: &Value) -> Option<i64> {
    if let Some(x) = v.as_i64() {
        return Some(x);
    }
    v.as_f64().filter(|x| x.is_finite()).map(|x| x as i64)
}

/// Trimmed, non-empty string from JSON value
pub fn text(v: &Value) -> Option<String> {
    v.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Round to one decimal place, half away from zero
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Calculate distance between two coordinates using Haversine formula
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let rlat1 = lat1.to_radians();
    let rlat2 = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + rlat1.cos() * rlat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    6371.0 * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_km_zero_distance() {
        let distance = haversine_km(0.0, 0.0, 0.0, 0.0);
        assert_eq!(distance, 0.0);
    }

    #[test]
    fn test_haversine_km_known_distance() {
        // Delhi (28.5562°N, 77.1000°E) to Mumbai (19.0896°N, 72.8656°E)
        // Approximate distance: ~1148 km
        let distance = haversine_km(28.5562, 77.1000, 19.0896, 72.8656);
        assert!((distance - 1148.0).abs() < 15.0);
    }

    #[test]
    fn test_num_from_float() {
        let json = serde_json::json!(42.5);
        assert_eq!(num(&json), Some(42.5));
    }

    #[test]
    fn test_num_from_null() {
        assert_eq!(num(&Value::Null), None);
    }

    #[test]
    fn test_int_from_float() {
        assert_eq!(int(&serde_json::json!(1705315800.0)), Some(1705315800));
        assert_eq!(int(&serde_json::json!(3)), Some(3));
        assert_eq!(int(&serde_json::json!("3")), None);
    }

    #[test]
    fn test_text_trims_and_drops_empty() {
        assert_eq!(text(&serde_json::json!("AIC101  ")), Some("AIC101".to_string()));
        assert_eq!(text(&serde_json::json!("    ")), None);
        assert_eq!(text(&Value::Null), None);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(60.0), 60.0);
        assert_eq!(round1(100.0 / 3.0), 33.3);
        assert_eq!(round1(200.0 / 3.0), 66.7);
    }
}
