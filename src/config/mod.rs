/// Application configuration module
use crate::domain::Region;
use std::env;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: Option<String>,
    pub opensky_url: String,
    pub default_region: Region,
    pub fetch_timeout: Duration,
    pub airport_radius_deg: f64,
    pub ttls: ViewTtls,
    /// How long an unused region stays cached
    pub cache_retention: Duration,
    /// Cache warm-up period for the default region, `None` disables it
    pub refresh_every: Option<Duration>,
}

/// Freshness windows per display view
#[derive(Clone, Debug)]
pub struct ViewTtls {
    pub overview: Duration,
    pub live: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let opensky_url = env::var("OPENSKY_URL")
            .unwrap_or_else(|_| "https://opensky-network.org/api/states/all".to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        let default_region = Region::new(
            env_f64("REGION_LAMIN", Region::INDIA.lamin),
            env_f64("REGION_LAMAX", Region::INDIA.lamax),
            env_f64("REGION_LOMIN", Region::INDIA.lomin),
            env_f64("REGION_LOMAX", Region::INDIA.lomax),
        );
        if !default_region.is_valid() {
            anyhow::bail!("invalid default region bounds: {:?}", default_region);
        }

        let ttls = ViewTtls {
            overview: Duration::from_secs(env_u64("OVERVIEW_TTL_SECONDS", 30)),
            live: Duration::from_secs(env_u64("LIVE_TTL_SECONDS", 20)),
        };

        let refresh_every = match env_u64("REFRESH_EVERY_SECONDS", 0) {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            bind_addr,
            database_url,
            opensky_url,
            default_region,
            fetch_timeout: Duration::from_secs(env_u64("FETCH_TIMEOUT_SECONDS", 10)),
            airport_radius_deg: env_f64("AIRPORT_RADIUS_DEG", 1.0),
            ttls,
            cache_retention: Duration::from_secs(env_u64("CACHE_RETENTION_SECONDS", 600)),
            refresh_every,
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_u64_falls_back_on_garbage() {
        env::set_var("AERO_TEST_U64_GARBAGE", "abc");
        assert_eq!(env_u64("AERO_TEST_U64_GARBAGE", 7), 7);
        env::set_var("AERO_TEST_U64_OK", "42");
        assert_eq!(env_u64("AERO_TEST_U64_OK", 7), 42);
    }

    #[test]
    fn test_env_f64_rejects_non_finite() {
        env::set_var("AERO_TEST_F64_NAN", "NaN");
        assert_eq!(env_f64("AERO_TEST_F64_NAN", 1.0), 1.0);
        assert_eq!(env_f64("AERO_TEST_F64_MISSING", 2.5), 2.5);
    }
}
