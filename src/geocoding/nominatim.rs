//! OpenStreetMap Nominatim provider.
//!
//! Issues `GET {base_url}/search?q=<address>&format=json&limit=1` and maps the
//! first place to a [`Location`]. Transport timeouts become
//! [`LookupError::TimedOut`]; anything else that prevents a usable answer
//! (connection errors, non-2xx status, malformed body) is a
//! [`LookupError::Service`]. An empty result array is an absent match.

use async_trait::async_trait;
use awc::Client;
use awc::error::SendRequestError;
use awc::http::header;
use serde::Deserialize;
use std::time::Duration;

use crate::config::GeocoderConfig;

use super::{Coordinates, GeocodeProvider, Location, LookupError};

/// Upper bound on the response body we are willing to buffer
const MAX_BODY_BYTES: usize = 256 * 1024;

#[derive(Debug, Clone)]
pub struct NominatimProvider {
    base_url: String,
    user_agent: String,
}

impl NominatimProvider {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: user_agent.into(),
        }
    }

    pub fn from_config(config: &GeocoderConfig) -> Self {
        Self::new(config.base_url.clone(), config.user_agent.clone())
    }

    pub fn search_url(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl Default for NominatimProvider {
    fn default() -> Self {
        Self::from_config(&GeocoderConfig::default())
    }
}

#[async_trait(?Send)]
impl GeocodeProvider for NominatimProvider {
    async fn lookup(&self, address: &str, timeout: Duration) -> Result<Option<Location>, LookupError> {
        let request = Client::default()
            .get(self.search_url())
            .insert_header((header::USER_AGENT, self.user_agent.as_str()))
            .timeout(timeout)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .map_err(|e| LookupError::Service(format!("Invalid query: {}", e)))?;

        let mut response = request.send().await.map_err(|e| match e {
            SendRequestError::Timeout => LookupError::TimedOut(timeout),
            other => LookupError::Service(other.to_string()),
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Nominatim returned an error status");
            return Err(LookupError::Service(format!("HTTP {}", status.as_u16())));
        }

        let body = response
            .body()
            .limit(MAX_BODY_BYTES)
            .await
            .map_err(|e| LookupError::Service(format!("Failed to read response body: {}", e)))?;

        parse_places(&body)
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Map a Nominatim `format=json` search body to the first matching location
pub fn parse_places(body: &[u8]) -> Result<Option<Location>, LookupError> {
    let places: Vec<Place> = serde_json::from_slice(body)
        .map_err(|e| LookupError::Service(format!("Malformed response body: {}", e)))?;

    let Some(place) = places.into_iter().next() else {
        return Ok(None);
    };

    let latitude = parse_degrees("lat", &place.lat)?;
    let longitude = parse_degrees("lon", &place.lon)?;
    let coordinates = Coordinates::new(latitude, longitude)
        .map_err(|e| LookupError::Service(e.to_string()))?;

    Ok(Some(Location {
        coordinates,
        display_name: place.display_name,
    }))
}

fn parse_degrees(field: &str, value: &str) -> Result<f64, LookupError> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| LookupError::Service(format!("Invalid {} value: {:?}", field, value)))
}
