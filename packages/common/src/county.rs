//! County lookup by point-in-polygon over a fixed boundary set.
//!
//! Boundaries are loaded once (normally from a GeoJSON FeatureCollection of
//! `Polygon`/`MultiPolygon` features in WGS84) and never change afterwards.
//! Containment uses even-odd ray casting. A point lying exactly on a border
//! shared by two counties may resolve to either of them, or to neither.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// `(x, y)` = `(longitude, latitude)`, the GeoJSON axis order.
pub type Position = (f64, f64);

#[derive(Debug, Error)]
pub enum CountyDataError {
    #[error("Failed to read county boundaries from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed county GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Feature {index} has no string '{property}' property")]
    MissingName { index: usize, property: String },
    #[error("Feature {index} has an invalid ring: {reason}")]
    InvalidRing { index: usize, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    exterior: Vec<Position>,
    holes: Vec<Vec<Position>>,
}

impl Polygon {
    pub fn new(exterior: Vec<Position>, holes: Vec<Vec<Position>>) -> Self {
        Self { exterior, holes }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        ring_contains(&self.exterior, x, y) && !self.holes.iter().any(|h| ring_contains(h, x, y))
    }
}

fn ring_contains(ring: &[Position], x: f64, y: f64) -> bool {
    let mut inside = false;
    let mut j = match ring.len() {
        0 => return false,
        n => n - 1,
    };
    for i in 0..ring.len() {
        let (xi, yi) = ring[i];
        let (xj, yj) = ring[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundingBox {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl BoundingBox {
    fn around(polygons: &[Polygon]) -> Self {
        let mut bbox = BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for &(x, y) in polygons.iter().flat_map(|p| p.exterior.iter()) {
            bbox.min_x = bbox.min_x.min(x);
            bbox.min_y = bbox.min_y.min(y);
            bbox.max_x = bbox.max_x.max(x);
            bbox.max_y = bbox.max_y.max(y);
        }
        bbox
    }

    fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

/// A named administrative boundary made of one or more polygons.
#[derive(Debug, Clone)]
pub struct County {
    name: String,
    polygons: Vec<Polygon>,
    bbox: BoundingBox,
}

impl County {
    pub fn new(name: impl Into<String>, polygons: Vec<Polygon>) -> Self {
        let bbox = BoundingBox::around(&polygons);
        Self {
            name: name.into(),
            polygons,
            bbox,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.bbox.contains(lon, lat) && self.polygons.iter().any(|p| p.contains(lon, lat))
    }
}

/// Read-only county boundary set.
#[derive(Debug, Clone, Default)]
pub struct CountyLocator {
    counties: Vec<County>,
}

impl CountyLocator {
    pub fn new(counties: Vec<County>) -> Self {
        Self { counties }
    }

    /// A locator with no boundaries; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }

    /// Name of the county containing the point, if any.
    pub fn locate(&self, lat: f64, lon: f64) -> Option<&str> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        self.counties
            .iter()
            .find(|c| c.contains(lat, lon))
            .map(County::name)
    }

    pub fn from_geojson_file(
        path: impl AsRef<Path>,
        name_property: &str,
    ) -> Result<Self, CountyDataError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CountyDataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_geojson_str(&raw, name_property)
    }

    pub fn from_geojson_str(raw: &str, name_property: &str) -> Result<Self, CountyDataError> {
        let collection: FeatureCollection = serde_json::from_str(raw)?;
        let mut counties = Vec::with_capacity(collection.features.len());

        for (index, feature) in collection.features.into_iter().enumerate() {
            let Some(geometry) = feature.geometry else {
                tracing::debug!(index, "Skipping county feature without geometry");
                continue;
            };
            let name = feature
                .properties
                .as_ref()
                .and_then(|props| props.get(name_property))
                .and_then(Value::as_str)
                .ok_or_else(|| CountyDataError::MissingName {
                    index,
                    property: name_property.to_string(),
                })?
                .to_string();

            let polygons = match geometry {
                Geometry::Polygon { coordinates } => vec![polygon_from_rings(index, coordinates)?],
                Geometry::MultiPolygon { coordinates } => coordinates
                    .into_iter()
                    .map(|rings| polygon_from_rings(index, rings))
                    .collect::<Result<Vec<_>, _>>()?,
            };
            counties.push(County::new(name, polygons));
        }

        Ok(Self::new(counties))
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
}

fn polygon_from_rings(index: usize, rings: Vec<Vec<Vec<f64>>>) -> Result<Polygon, CountyDataError> {
    let mut rings = rings
        .into_iter()
        .map(|ring| ring_from_positions(index, ring))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();
    let exterior = rings.next().ok_or(CountyDataError::InvalidRing {
        index,
        reason: "polygon has no exterior ring",
    })?;
    Ok(Polygon::new(exterior, rings.collect()))
}

fn ring_from_positions(index: usize, ring: Vec<Vec<f64>>) -> Result<Vec<Position>, CountyDataError> {
    if ring.len() < 3 {
        return Err(CountyDataError::InvalidRing {
            index,
            reason: "ring needs at least three positions",
        });
    }
    ring.into_iter()
        .map(|pos| match pos.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Ok((*x, *y)),
            _ => Err(CountyDataError::InvalidRing {
                index,
                reason: "position needs two finite coordinates",
            }),
        })
        .collect()
}
