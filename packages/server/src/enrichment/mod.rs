//! Address enrichment: geocoder, then county locator, then property linker.
//!
//! Every step is best effort. A provider failure downgrades the result to
//! "unresolved" and is logged; it never fails the job operation that asked
//! for it.

pub mod geocoder;
pub mod property;

use std::sync::Arc;

use anyhow::Context;
use common::{CountyLocator, Resolution};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::AppConfig;

pub use geocoder::{AddressResolver, DisabledGeocoder, GeocodedAddress, GoogleGeocoder};
pub use property::{BcpaoLinker, PropertyLinker};

/// Why a provider call produced nothing. Logged, never returned to clients.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Provider returned HTTP {0}")]
    Status(u16),
    #[error("Provider reported status {0}")]
    Provider(String),
    #[error("Provider returned invalid coordinates ({lat}, {lon})")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

/// Coordinates and county of a resolved address. Always set together.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub lat: String,
    pub long: String,
    pub county: Option<String>,
}

/// Outcome of enriching one raw address.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedAddress {
    /// Provider-formatted address when resolved, otherwise the raw input.
    pub address: String,
    pub location: Resolution<Location>,
    pub property_link: Resolution<String>,
}

impl EnrichedAddress {
    pub fn report(&self) -> EnrichmentReport {
        let county_located = match &self.location {
            Resolution::Resolved(loc) => loc.county.is_some(),
            Resolution::Unresolved => false,
        };
        EnrichmentReport {
            geocoded: self.location.is_resolved(),
            county_located,
            property_linked: self.property_link.is_resolved(),
        }
    }
}

/// Which enrichment steps succeeded, returned with job mutations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct EnrichmentReport {
    pub geocoded: bool,
    pub county_located: bool,
    pub property_linked: bool,
}

/// Provider handles used by the job lifecycle.
pub struct Enrichment {
    resolver: Arc<dyn AddressResolver>,
    locator: Arc<CountyLocator>,
    linker: Arc<dyn PropertyLinker>,
    /// Property records are only looked up for addresses in this county.
    property_county: Option<String>,
}

impl Enrichment {
    pub fn new(
        resolver: Arc<dyn AddressResolver>,
        locator: Arc<CountyLocator>,
        linker: Arc<dyn PropertyLinker>,
        property_county: Option<String>,
    ) -> Self {
        Self {
            resolver,
            locator,
            linker,
            property_county: property_county.filter(|c| !c.trim().is_empty()),
        }
    }

    /// Build the production providers from configuration.
    ///
    /// A missing county file yields an empty locator; a broken one is fatal.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let locator = match &config.counties.geojson_path {
            Some(path) => {
                let locator =
                    CountyLocator::from_geojson_file(path, &config.counties.name_property)
                        .with_context(|| format!("loading counties from {}", path.display()))?;
                info!("Loaded {} county boundaries", locator.len());
                locator
            }
            None => {
                warn!("No county boundary file configured; counties will not be located");
                CountyLocator::empty()
            }
        };

        let resolver: Arc<dyn AddressResolver> = match &config.geocoding.api_key {
            Some(key) if !key.is_empty() => {
                Arc::new(GoogleGeocoder::new(&config.geocoding, key.clone())?)
            }
            _ => {
                warn!("No geocoding API key configured; addresses will not be geocoded");
                Arc::new(DisabledGeocoder)
            }
        };

        let linker = Arc::new(BcpaoLinker::new(&config.property_records)?);

        Ok(Self::new(
            resolver,
            Arc::new(locator),
            linker,
            config.property_records.county.clone(),
        ))
    }

    pub async fn resolve(&self, raw_address: &str) -> Resolution<GeocodedAddress> {
        self.resolver.resolve(raw_address).await
    }

    pub fn locate(&self, lat: f64, lon: f64) -> Option<String> {
        self.locator.locate(lat, lon).map(str::to_string)
    }

    /// Geocode, locate and link one address.
    ///
    /// The county lookup only runs on resolved coordinates. The property
    /// linker runs unless a different county than the configured one was
    /// located.
    pub async fn enrich(&self, raw_address: &str) -> EnrichedAddress {
        let (address, location) = match self.resolve(raw_address).await {
            Resolution::Resolved(found) => {
                let county = self.locate(found.lat, found.lon);
                let location = Location {
                    lat: found.lat.to_string(),
                    long: found.lon.to_string(),
                    county,
                };
                (found.formatted_address, Resolution::Resolved(location))
            }
            Resolution::Unresolved => (raw_address.to_string(), Resolution::Unresolved),
        };

        let county = match &location {
            Resolution::Resolved(loc) => loc.county.as_deref(),
            Resolution::Unresolved => None,
        };
        let property_link = if self.in_property_jurisdiction(county) {
            self.linker.link_for(&address).await
        } else {
            Resolution::Unresolved
        };

        EnrichedAddress {
            address,
            location,
            property_link,
        }
    }

    fn in_property_jurisdiction(&self, county: Option<&str>) -> bool {
        match (self.property_county.as_deref(), county) {
            (Some(wanted), Some(found)) => wanted.eq_ignore_ascii_case(found),
            _ => true,
        }
    }
}
