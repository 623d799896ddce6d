use std::time::Duration;

use async_trait::async_trait;
use common::Resolution;
use serde::Deserialize;
use tracing::{debug, warn};

use super::EnrichmentError;
use crate::config::GeocodingConfig;

/// A geocoding provider's answer for one address.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    pub formatted_address: String,
    pub lat: f64,
    pub lon: f64,
}

/// Turns free-text addresses into coordinates.
///
/// Implementations never fail: anything that goes wrong is `Unresolved`.
#[async_trait]
pub trait AddressResolver: Send + Sync {
    async fn resolve(&self, raw_address: &str) -> Resolution<GeocodedAddress>;
}

/// Resolver used when no API key is configured.
pub struct DisabledGeocoder;

#[async_trait]
impl AddressResolver for DisabledGeocoder {
    async fn resolve(&self, _raw_address: &str) -> Resolution<GeocodedAddress> {
        Resolution::Unresolved
    }
}

/// Google Geocoding API client.
pub struct GoogleGeocoder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GoogleGeocoder {
    pub fn new(config: &GeocodingConfig, api_key: String) -> Result<Self, EnrichmentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }

    async fn lookup(&self, raw_address: &str) -> Result<Option<GeocodedAddress>, EnrichmentError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("address", raw_address), ("key", self.api_key.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(EnrichmentError::Status(response.status().as_u16()));
        }

        let body: GeocodeResponse = response.json().await?;
        parse_geocode_response(body)
    }
}

#[async_trait]
impl AddressResolver for GoogleGeocoder {
    async fn resolve(&self, raw_address: &str) -> Resolution<GeocodedAddress> {
        match self.lookup(raw_address).await {
            Ok(Some(found)) => Resolution::Resolved(found),
            Ok(None) => {
                debug!(address = raw_address, "No geocoding candidates");
                Resolution::Unresolved
            }
            Err(e) => {
                warn!(address = raw_address, error = %e, "Geocoding unavailable");
                Resolution::Unresolved
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
pub struct GeocodeResult {
    pub formatted_address: String,
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub struct Geometry {
    pub location: LatLng,
}

#[derive(Debug, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Pick the top-ranked candidate.
///
/// `ZERO_RESULTS` is a clean miss (`Ok(None)`); any other non-`OK` status is
/// a provider error.
pub fn parse_geocode_response(
    body: GeocodeResponse,
) -> Result<Option<GeocodedAddress>, EnrichmentError> {
    match body.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" => return Ok(None),
        other => return Err(EnrichmentError::Provider(other.to_string())),
    }

    let Some(top) = body.results.into_iter().next() else {
        return Ok(None);
    };
    let LatLng { lat, lng } = top.geometry.location;
    if !valid_coordinates(lat, lng) {
        return Err(EnrichmentError::InvalidCoordinates { lat, lon: lng });
    }

    Ok(Some(GeocodedAddress {
        formatted_address: top.formatted_address,
        lat,
        lon: lng,
    }))
}

fn valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}
