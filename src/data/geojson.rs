use crate::{
    core::geo::LatLng,
    data::feature::{AttributeValue, Attributes, Feature, FeatureId, Geometry},
    prelude::HashSet,
    Result,
};
use serde::{Deserialize, Serialize};

/// A GeoJSON position; anything after `[lon, lat]` (elevation) is ignored
pub type Position = Vec<f64>;

/// GeoJSON geometry objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point {
        coordinates: Position,
    },
    LineString {
        coordinates: Vec<Position>,
    },
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPoint {
        coordinates: Vec<Position>,
    },
    MultiLineString {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    GeometryCollection {
        geometries: Vec<GeoJsonGeometry>,
    },
}

/// GeoJSON feature with geometry and properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonFeature {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub geometry: Option<GeoJsonGeometry>,
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Root GeoJSON object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoJson {
    Feature(GeoJsonFeature),
    FeatureCollection { features: Vec<GeoJsonFeature> },
}

impl GeoJson {
    pub fn from_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| crate::Error::ParseError(format!("Invalid GeoJSON: {}", e)).into())
    }

    /// Converts the document into typed features.
    ///
    /// Features without a usable geometry are skipped. Ids come from the
    /// GeoJSON `id` member; missing or repeated ids fall back to `#<index>`.
    pub fn into_features(self) -> Vec<Feature> {
        let raw = match self {
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::FeatureCollection { features } => features,
        };

        let mut seen = HashSet::default();
        let mut features = Vec::with_capacity(raw.len());

        for (index, feature) in raw.into_iter().enumerate() {
            let Some(geometry) = feature.geometry.as_ref().and_then(convert_geometry) else {
                log::debug!("skipping feature #{} without usable geometry", index);
                continue;
            };

            let id = feature
                .id
                .as_ref()
                .and_then(id_text)
                .filter(|id| !seen.contains(id))
                .unwrap_or_else(|| format!("#{}", index));
            seen.insert(id.clone());

            let attributes: Attributes = feature
                .properties
                .iter()
                .flatten()
                .map(|(name, value)| (name.clone(), AttributeValue::from(value)))
                .collect();

            features.push(Feature {
                id: FeatureId(id),
                geometry,
                attributes,
            });
        }

        features
    }
}

/// Parses a GeoJSON document straight into features
pub fn parse_features(text: &str) -> Result<Vec<Feature>> {
    Ok(GeoJson::from_str(text)?.into_features())
}

fn id_text(id: &serde_json::Value) -> Option<String> {
    match id {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn position(coord: &Position) -> Option<LatLng> {
    match coord.as_slice() {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => {
            Some(LatLng::from_lon_lat([*lon, *lat]))
        }
        _ => None,
    }
}

fn line(coords: &[Position]) -> Vec<LatLng> {
    coords.iter().filter_map(position).collect()
}

fn rings(coords: &[Vec<Position>]) -> Vec<Vec<LatLng>> {
    coords.iter().map(|ring| line(ring)).collect()
}

fn convert_geometry(geometry: &GeoJsonGeometry) -> Option<Geometry> {
    let converted = match geometry {
        GeoJsonGeometry::Point { coordinates } => Geometry::Point(position(coordinates)?),
        GeoJsonGeometry::LineString { coordinates } => Geometry::LineString(line(coordinates)),
        GeoJsonGeometry::Polygon { coordinates } => Geometry::Polygon(rings(coordinates)),
        GeoJsonGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(line(coordinates)),
        GeoJsonGeometry::MultiLineString { coordinates } => {
            Geometry::MultiLineString(rings(coordinates))
        }
        GeoJsonGeometry::MultiPolygon { coordinates } => Geometry::MultiPolygon(
            coordinates.iter().map(|polygon| rings(polygon)).collect(),
        ),
        GeoJsonGeometry::GeometryCollection { .. } => return None,
    };

    converted.bounds().map(|_| converted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_collection_parsing() {
        let text = r#"
        {
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": 7,
                    "properties": {"nama": "RTH Putri Kaca Mayang", "alamat": "Jl. Jend. Sudirman"},
                    "geometry": {"type": "Point", "coordinates": [101.4478, 0.5263, 12.0]}
                },
                {
                    "type": "Feature",
                    "properties": {"DESA": "Rumbai"},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[101.4, 0.5], [101.5, 0.5], [101.5, 0.6], [101.4, 0.5]]]
                    }
                }
            ]
        }
        "#;

        let features = parse_features(text).unwrap();
        assert_eq!(features.len(), 2);

        assert_eq!(features[0].id, FeatureId::from("7"));
        assert_eq!(
            features[0].geometry,
            Geometry::Point(LatLng::new(0.5263, 101.4478))
        );
        assert_eq!(
            features[0].attributes.text("alamat").as_deref(),
            Some("Jl. Jend. Sudirman")
        );

        assert_eq!(features[1].id, FeatureId::from("#1"));
        assert_eq!(features[1].geometry.kind(), "Polygon");
        assert_eq!(features[1].attributes.text("DESA").as_deref(), Some("Rumbai"));
    }

    #[test]
    fn test_skips_unusable_geometry_and_dedups_ids() {
        let text = r#"
        {
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": "a", "geometry": null, "properties": {}},
                {"type": "Feature", "id": "b", "geometry": {"type": "Point", "coordinates": [1.0]}},
                {"type": "Feature", "id": "c", "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
                {"type": "Feature", "id": "c", "geometry": {"type": "Point", "coordinates": [3.0, 4.0]}}
            ]
        }
        "#;

        let features = parse_features(text).unwrap();
        let ids: Vec<_> = features.iter().map(|f| f.id.0.as_str()).collect();
        assert_eq!(ids, vec!["c", "#3"]);
        assert!(features[0].attributes.is_empty());
    }

    #[test]
    fn test_single_feature_document() {
        let text = r#"{"type": "Feature", "properties": null,
            "geometry": {"type": "LineString", "coordinates": [[101.0, 0.0], [102.0, 1.0]]}}"#;
        let features = parse_features(text).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].geometry.vertices().len(), 2);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        assert!(parse_features("{\"type\": \"FeatureCollection\"").is_err());
        assert!(parse_features("{\"type\": \"Topology\"}").is_err());
    }
}
