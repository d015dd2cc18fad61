//! Reverse geocoding and map tiles over HTTP
//!
//! Both endpoints are unreliable external dependencies, so nothing in here
//! propagates a failure to the pipeline. The typed calls
//! ([`GeocodeClient::lookup_address`], [`GeocodeClient::fetch_map`]) report
//! *why* a lookup failed; the flattened calls
//! ([`GeocodeClient::reverse_geocode`], [`GeocodeClient::get_map_image`]) turn
//! that into a placeholder string or `None` for display.

use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GeocoderConfig;
use crate::error::Result;

/// Why an address or map could not be resolved.
///
/// `Display` renders the placeholder shown in place of an address.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("Address not found")]
    NotFound,

    #[error("Address not found (HTTP error)")]
    Http(u16),

    #[error("Address not found (exception: {0})")]
    Transport(String),
}

impl From<reqwest::Error> for GeocodeError {
    fn from(e: reqwest::Error) -> Self {
        GeocodeError::Transport(e.to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ReverseReply {
    display_name: Option<String>,
}

/// Client for the reverse geocoding and static map endpoints
#[derive(Debug, Clone)]
pub struct GeocodeClient {
    http: reqwest::Client,
    reverse_url: String,
    map_url: String,
    map_zoom: u8,
    map_size: (u32, u32),
}

impl GeocodeClient {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            reverse_url: config.reverse_url.clone(),
            map_url: config.map_url.clone(),
            map_zoom: config.map_zoom,
            map_size: (config.map_width, config.map_height),
        })
    }

    /// Resolve coordinates to a postal address
    pub async fn lookup_address(
        &self,
        lat: f64,
        lon: f64,
    ) -> std::result::Result<String, GeocodeError> {
        debug!("Reverse geocoding {}, {}", lat, lon);

        let response = self
            .http
            .get(&self.reverse_url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GeocodeError::Http(status.as_u16()));
        }

        let reply: ReverseReply = response.json().await?;
        reply.display_name.ok_or(GeocodeError::NotFound)
    }

    /// Address or placeholder; never fails
    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> String {
        match self.lookup_address(lat, lon).await {
            Ok(address) => address,
            Err(e) => {
                warn!("Reverse geocoding failed for {}, {}: {:?}", lat, lon, e);
                e.to_string()
            }
        }
    }

    /// Fetch a map tile centered on the coordinates with a marker
    pub async fn fetch_map(
        &self,
        lat: f64,
        lon: f64,
    ) -> std::result::Result<Vec<u8>, GeocodeError> {
        let point = format!("{},{}", lon, lat);
        let response = self
            .http
            .get(&self.map_url)
            .query(&[
                ("ll", point.clone()),
                ("z", self.map_zoom.to_string()),
                ("l", "map".to_string()),
                ("size", format!("{},{}", self.map_size.0, self.map_size.1)),
                ("pt", format!("{},pm2rdm", point)),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(GeocodeError::Http(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Map image bytes, or `None` when there is no map to display
    pub async fn get_map_image(&self, lat: f64, lon: f64) -> Option<Vec<u8>> {
        match self.fetch_map(lat, lon).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("Map fetch failed for {}, {}: {:?}", lat, lon, e);
                None
            }
        }
    }
}
