//! Nominatim Lookup Provider
//!
//! Implements LookupProvider using the OpenStreetMap Nominatim HTTP API.
//!
//! See: https://nominatim.org/release-docs/latest/api/Overview/

use crate::domain::entities::LookupOutcome;
use crate::domain::ports::{LookupProvider, ProviderError};
use crate::domain::value_objects::GeoPoint;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// One hit from `/search`. Nominatim sends coordinates as strings.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Body of `/reverse`. A miss comes back as 200 with only `error` set.
#[derive(Debug, Deserialize)]
struct ReverseHit {
    display_name: Option<String>,
    error: Option<String>,
}

/// Configuration for the Nominatim client.
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// Base URL (e.g., "https://nominatim.openstreetmap.org")
    pub base_url: String,
    /// Timeout for a single provider call
    pub timeout: Duration,
    /// User-Agent header; Nominatim's usage policy requires one
    pub user_agent: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("geo-rest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Nominatim-backed lookup provider.
pub struct NominatimProvider {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimProvider {
    /// Build a provider with its own HTTP client.
    pub fn new(config: NominatimConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Issue one GET and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    fn parse_hit(hit: &SearchHit) -> Result<GeoPoint, ProviderError> {
        let latitude = hit
            .lat
            .parse::<f64>()
            .map_err(|e| ProviderError::Decode(format!("invalid lat '{}': {}", hit.lat, e)))?;
        let longitude = hit
            .lon
            .parse::<f64>()
            .map_err(|e| ProviderError::Decode(format!("invalid lon '{}': {}", hit.lon, e)))?;
        let point = GeoPoint::new(latitude, longitude);
        if !point.in_range() {
            return Err(ProviderError::Decode(format!("coordinates out of range: {}", point)));
        }
        Ok(point)
    }
}

#[async_trait]
impl LookupProvider for NominatimProvider {
    async fn resolve_address(&self, address: &str) -> Result<LookupOutcome, ProviderError> {
        let query = [
            ("q", address.to_string()),
            ("format", "jsonv2".to_string()),
            ("limit", "1".to_string()),
        ];
        let hits: Vec<SearchHit> = self.get_json("search", &query).await?;

        match hits.first() {
            Some(hit) => Ok(LookupOutcome::found(Self::parse_hit(hit)?.to_string())),
            None => Ok(LookupOutcome::no_match()),
        }
    }

    async fn resolve_coordinates(&self, point: GeoPoint) -> Result<LookupOutcome, ProviderError> {
        let query = [
            ("lat", point.latitude.to_string()),
            ("lon", point.longitude.to_string()),
            ("format", "jsonv2".to_string()),
        ];
        let hit: ReverseHit = self.get_json("reverse", &query).await?;

        match (hit.error, hit.display_name) {
            (None, Some(address)) => Ok(LookupOutcome::found(address)),
            (Some(reason), _) => {
                tracing::debug!("nominatim reverse miss for {}: {}", point, reason);
                Ok(LookupOutcome::no_match())
            }
            (None, None) => Ok(LookupOutcome::no_match()),
        }
    }
}
