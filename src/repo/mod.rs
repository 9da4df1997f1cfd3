/// Repository layer for the read-only airport reference store
use crate::domain::Airport;
use crate::errors::ApiResult;
use sqlx::PgPool;

type AirportRow = (
    Option<String>,
    String,
    Option<String>,
    String,
    f64,
    f64,
);

fn to_airport(
    (iata_code, name, city, country, latitude, longitude): AirportRow,
) -> Airport {
    Airport {
        iata_code,
        name,
        city,
        country,
        latitude,
        longitude,
    }
}

/// Airports loaded by the reference-data ETL
#[derive(Clone)]
pub struct AirportRepo {
    pool: PgPool,
}

impl AirportRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List airports of a country ordered by name
    pub async fn list_by_country(&self, country: &str) -> ApiResult<Vec<Airport>> {
        let rows = sqlx::query_as::<_, AirportRow>(
            "SELECT iata_code, name, city, country, latitude, longitude
             FROM airports
             WHERE country = $1 AND latitude IS NOT NULL AND longitude IS NOT NULL
             ORDER BY name",
        )
        .bind(country)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(to_airport).collect())
    }

    /// Look up one airport by IATA code
    pub async fn find_by_iata(&self, iata: &str) -> ApiResult<Option<Airport>> {
        let row = sqlx::query_as::<_, AirportRow>(
            "SELECT iata_code, name, city, country, latitude, longitude
             FROM airports
             WHERE iata_code = $1 AND latitude IS NOT NULL AND longitude IS NOT NULL
             LIMIT 1",
        )
        .bind(iata)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(to_airport))
    }
}
