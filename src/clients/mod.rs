/// External API clients module
use crate::domain::{RawSnapshot, Region};
use crate::errors::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Capability to query one bounded region of live state vectors.
///
/// Implementations perform exactly one request per call and never retry.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, region: &Region) -> Result<RawSnapshot, FetchError>;
}

/// HTTP client wrapper with common configuration
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("aero-live-service/1.0")
            .build()?;
        Ok(Self { client })
    }

    pub fn get_client(&self) -> &Client {
        &self.client
    }
}

/// OpenSky Network `states/all` client
pub struct OpenSkyClient {
    http_client: HttpClient,
    base_url: String,
}

impl OpenSkyClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            http_client: HttpClient::new(timeout)?,
            base_url,
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SnapshotSource for OpenSkyClient {
    async fn fetch(&self, region: &Region) -> Result<RawSnapshot, FetchError> {
        let resp = self
            .http_client
            .get_client()
            .get(&self.base_url)
            .query(&[
                ("lamin", region.lamin),
                ("lamax", region.lamax),
                ("lomin", region.lomin),
                ("lomax", region.lomax),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }

        let body = resp.text().await?;
        parse_states(&body)
    }
}

/// Decode a `states/all` response body.
///
/// `states` is `null` when no aircraft are in the box; that is an empty
/// region, not a failure.
pub fn parse_states(body: &str) -> Result<RawSnapshot, FetchError> {
    serde_json::from_str::<RawSnapshot>(body).map_err(|e| FetchError::Malformed(e.to_string()))
}
