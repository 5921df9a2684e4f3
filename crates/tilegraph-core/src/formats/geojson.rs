//! # GeoJSON Tiles
//!
//! Reads a `FeatureCollection` of already-buffered tile geometries.
//!
//! `Polygon` and `MultiPolygon` geometries are kept; any other geometry type
//! (or a null geometry) becomes an empty multipolygon, which never overlaps
//! anything. Coordinates beyond x/y are dropped.

use super::KeyColumns;
use crate::primitives::{TILE_KEY_FALLBACK_FIELD, TILE_KEY_FIELD};
use crate::{TileGraphError, TileId};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::Path;

// =============================================================================
// RAW GEOJSON
// =============================================================================

type Ring = Vec<Vec<f64>>;

#[derive(Debug, Deserialize)]
struct RawCollection {
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<RawGeometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawGeometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
    #[serde(other)]
    Unsupported,
}

fn to_ring(ring: &Ring) -> Result<LineString<f64>, TileGraphError> {
    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(TileGraphError::InvalidInput(
                "GeoJSON position needs at least two values".to_string(),
            )),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(LineString::new)
}

fn to_polygon(rings: &[Ring]) -> Result<Option<Polygon<f64>>, TileGraphError> {
    let Some((exterior, interiors)) = rings.split_first() else {
        return Ok(None);
    };
    let interiors = interiors.iter().map(to_ring).collect::<Result<Vec<_>, _>>()?;
    Ok(Some(Polygon::new(to_ring(exterior)?, interiors)))
}

impl RawGeometry {
    fn into_multipolygon(self) -> Result<MultiPolygon<f64>, TileGraphError> {
        let polygons = match self {
            Self::Polygon { coordinates } => to_polygon(&coordinates)?.into_iter().collect(),
            Self::MultiPolygon { coordinates } => {
                let mut polygons = Vec::with_capacity(coordinates.len());
                for rings in &coordinates {
                    polygons.extend(to_polygon(rings)?);
                }
                polygons
            }
            Self::Unsupported => Vec::new(),
        };
        Ok(MultiPolygon::new(polygons))
    }
}

// =============================================================================
// TILE LAYER
// =============================================================================

/// A tile as read from the layer: its properties and buffered geometry.
#[derive(Debug, Clone)]
pub struct TileFeature {
    pub properties: Map<String, Value>,
    pub geometry: MultiPolygon<f64>,
}

/// Ordered collection of buffered tiles.
#[derive(Debug, Clone, Default)]
pub struct TileLayer {
    features: Vec<TileFeature>,
}

impl TileLayer {
    /// Parse a GeoJSON `FeatureCollection`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TileGraphError> {
        let raw: RawCollection = serde_json::from_slice(bytes)?;
        let mut features = Vec::with_capacity(raw.features.len());
        for feature in raw.features {
            let geometry = match feature.geometry {
                Some(geometry) => geometry.into_multipolygon()?,
                None => MultiPolygon::new(Vec::new()),
            };
            features.push(TileFeature {
                properties: feature.properties.unwrap_or_default(),
                geometry,
            });
        }
        Ok(Self { features })
    }

    /// Read a GeoJSON file.
    pub fn read(path: &Path) -> Result<Self, TileGraphError> {
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    /// Build a layer from identifiers and geometries; ids go into `tile_key`.
    pub fn from_tiles<I>(tiles: I) -> Self
    where
        I: IntoIterator<Item = (TileId, MultiPolygon<f64>)>,
    {
        let features = tiles
            .into_iter()
            .map(|(id, geometry)| {
                let mut properties = Map::new();
                properties.insert(TILE_KEY_FIELD.to_string(), Value::String(id.0));
                TileFeature {
                    properties,
                    geometry,
                }
            })
            .collect();
        Self { features }
    }

    /// Number of tiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// True when the layer holds no tiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features in file order.
    #[must_use]
    pub fn features(&self) -> &[TileFeature] {
        &self.features
    }

    /// Tile identifiers and geometries, index-aligned, in file order.
    ///
    /// Identifiers come from `tile_key`, falling back to `key`.
    pub fn tiles(&self) -> Result<(Vec<TileId>, Vec<MultiPolygon<f64>>), TileGraphError> {
        let ids = self
            .string_column(TILE_KEY_FIELD)
            .or_else(|| self.string_column(TILE_KEY_FALLBACK_FIELD))
            .ok_or_else(|| TileGraphError::MissingColumn(TILE_KEY_FIELD.to_string()))?;
        let geometries = self.features.iter().map(|f| f.geometry.clone()).collect();
        Ok((ids.into_iter().map(TileId).collect(), geometries))
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl KeyColumns for TileLayer {
    /// A property counts as a column when every feature carries it.
    fn string_column(&self, name: &str) -> Option<Vec<String>> {
        self.features
            .iter()
            .map(|f| f.properties.get(name).map(render))
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    const LAYER: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"tile_key": "t1", "key": 1},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[2,0],[2,2],[0,2],[0,0]]]}
            },
            {
                "type": "Feature",
                "properties": {"tile_key": "t2", "key": 2},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[0,0,5],[1,0,5],[1,1,5],[0,1,5],[0,0,5]]],
                    [[[3,3],[4,3],[4,4],[3,4],[3,3]]]
                ]}
            },
            {
                "type": "Feature",
                "properties": {"tile_key": "t3"},
                "geometry": {"type": "Point", "coordinates": [0, 0]}
            }
        ]
    }"#;

    #[test]
    fn parses_polygons_and_multipolygons() {
        let layer = TileLayer::from_slice(LAYER.as_bytes()).expect("parse");
        assert_eq!(layer.len(), 3);

        let (ids, geometries) = layer.tiles().expect("tiles");
        assert_eq!(ids, vec![TileId::from("t1"), TileId::from("t2"), TileId::from("t3")]);
        assert!((geometries[0].unsigned_area() - 4.0).abs() < 1e-12);
        assert!((geometries[1].unsigned_area() - 2.0).abs() < 1e-12);
        assert!(geometries[2].0.is_empty());
    }

    #[test]
    fn column_requires_every_feature() {
        let layer = TileLayer::from_slice(LAYER.as_bytes()).expect("parse");
        assert!(layer.string_column("key").is_none());
        assert_eq!(
            layer.string_column("tile_key"),
            Some(vec!["t1".to_string(), "t2".to_string(), "t3".to_string()])
        );
    }

    #[test]
    fn falls_back_to_key_property() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"key":7},"geometry":null}
        ]}"#;
        let layer = TileLayer::from_slice(json.as_bytes()).expect("parse");
        let (ids, _) = layer.tiles().expect("tiles");
        assert_eq!(ids, vec![TileId::from("7")]);
    }

    #[test]
    fn missing_identifier_is_an_error() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"name":"x"},"geometry":null}
        ]}"#;
        let layer = TileLayer::from_slice(json.as_bytes()).expect("parse");
        assert!(matches!(layer.tiles(), Err(TileGraphError::MissingColumn(_))));
    }

    #[test]
    fn short_position_rejected() {
        let json = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{},"geometry":{"type":"Polygon","coordinates":[[[0]]]}}
        ]}"#;
        assert!(TileLayer::from_slice(json.as_bytes()).is_err());
    }
}
