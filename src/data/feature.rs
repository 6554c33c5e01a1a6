//! Typed map features: geometry plus a small closed set of attribute values.

use crate::core::{
    geo::{LatLng, LatLngBounds, Point},
    viewport::Viewport,
};
use crate::prelude::HashMap;
use geo::{Contains, EuclideanDistance};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute value as read from a GeoJSON `properties` object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Null,
}

impl AttributeValue {
    /// Text shown to the user, or `None` when the value should fall through
    /// to the next candidate (null, empty or whitespace-only text).
    pub fn display(&self) -> Option<String> {
        match self {
            AttributeValue::Text(text) if text.trim().is_empty() => None,
            AttributeValue::Text(text) => Some(text.clone()),
            AttributeValue::Number(n) => Some(format_number(*n)),
            AttributeValue::Null => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            AttributeValue::Text(text) => text.trim().parse().ok(),
            AttributeValue::Null => None,
        }
    }
}

impl From<&serde_json::Value> for AttributeValue {
    fn from(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttributeValue::Null,
            serde_json::Value::String(s) => AttributeValue::Text(s.clone()),
            serde_json::Value::Number(n) => {
                n.as_f64().map_or(AttributeValue::Null, AttributeValue::Number)
            }
            serde_json::Value::Bool(b) => AttributeValue::Text(b.to_string()),
            other => AttributeValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Number(value as f64)
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Attribute name → value mapping of one feature
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: HashMap<String, AttributeValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    /// Displayable text of a single attribute
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).and_then(AttributeValue::display)
    }

    /// First displayable value among `names`, in order
    pub fn first_text<S: AsRef<str>>(&self, names: &[S]) -> Option<String> {
        names.iter().find_map(|name| self.text(name.as_ref()))
    }

    /// Like [`Attributes::first_text`], resolving to `fallback` when nothing displays
    pub fn text_or<S: AsRef<str>>(&self, names: &[S], fallback: &str) -> String {
        self.first_text(names)
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, AttributeValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (String, AttributeValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Feature geometry in geographic coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(LatLng),
    LineString(Vec<LatLng>),
    /// Outer ring first, then holes
    Polygon(Vec<Vec<LatLng>>),
    MultiPoint(Vec<LatLng>),
    MultiLineString(Vec<Vec<LatLng>>),
    MultiPolygon(Vec<Vec<Vec<LatLng>>>),
}

impl Geometry {
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn is_point_like(&self) -> bool {
        matches!(self, Geometry::Point(_) | Geometry::MultiPoint(_))
    }

    /// Every vertex of the geometry, holes included
    pub fn vertices(&self) -> Vec<LatLng> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::LineString(points) | Geometry::MultiPoint(points) => points.clone(),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                rings.iter().flatten().copied().collect()
            }
            Geometry::MultiPolygon(polygons) => {
                polygons.iter().flatten().flatten().copied().collect()
            }
        }
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(&self.vertices())
    }

    /// Mean of the outer ring's vertices, taken exactly as stored. This is a
    /// cheap label anchor, not the area centroid.
    pub fn outer_ring_mean(&self) -> Option<LatLng> {
        let Geometry::Polygon(rings) = self else {
            return None;
        };
        let ring = rings.first().filter(|ring| !ring.is_empty())?;

        let count = ring.len() as f64;
        let (lat, lng) = ring
            .iter()
            .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
        Some(LatLng::new(lat / count, lng / count))
    }

    /// Whether the pixel falls on this geometry as drawn in `viewport`.
    ///
    /// Polygons hit on their interior (holes excluded) or within `tolerance`
    /// of any ring, lines within `tolerance`, points inside `marker`.
    pub fn hit_test(
        &self,
        viewport: &Viewport,
        pixel: &Point,
        tolerance: f64,
        marker: PointMarker,
    ) -> bool {
        let cursor = geo::Point::new(pixel.x, pixel.y);
        let to_screen = |ring: &[LatLng]| -> geo::LineString<f64> {
            ring.iter()
                .map(|p| {
                    let px = viewport.lat_lng_to_pixel(p);
                    (px.x, px.y)
                })
                .collect::<Vec<_>>()
                .into()
        };
        let near_line = |line: &geo::LineString<f64>| {
            line.0.len() > 1 && cursor.euclidean_distance(line) <= tolerance
        };
        let hits_polygon = |rings: &[Vec<LatLng>]| {
            let Some((outer, holes)) = rings.split_first() else {
                return false;
            };
            let exterior = to_screen(outer);
            let interiors: Vec<_> = holes.iter().map(|hole| to_screen(hole)).collect();
            if interiors.iter().chain(std::iter::once(&exterior)).any(|line| near_line(line)) {
                return true;
            }
            exterior.0.len() > 2 && geo::Polygon::new(exterior, interiors).contains(&cursor)
        };
        let hits_point = |p: &LatLng| marker.contains(&viewport.lat_lng_to_pixel(p), pixel);

        match self {
            Geometry::Point(p) => hits_point(p),
            Geometry::MultiPoint(points) => points.iter().any(|p| hits_point(p)),
            Geometry::LineString(points) => near_line(&to_screen(points)),
            Geometry::MultiLineString(lines) => lines.iter().any(|line| near_line(&to_screen(line))),
            Geometry::Polygon(rings) => hits_polygon(rings),
            Geometry::MultiPolygon(polygons) => polygons.iter().any(|rings| hits_polygon(rings)),
        }
    }
}

/// Screen area a point feature occupies around its projected position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointMarker {
    /// Circle of the given radius centred on the point
    Circle(f64),
    /// Rectangle given as offsets from the point, as covered by an anchored icon
    Box { min: Point, max: Point },
}

impl PointMarker {
    pub fn contains(&self, center: &Point, pixel: &Point) -> bool {
        match self {
            PointMarker::Circle(radius) => center.distance_to(pixel) <= *radius,
            PointMarker::Box { min, max } => {
                let (dx, dy) = (pixel.x - center.x, pixel.y - center.y);
                dx >= min.x && dx <= max.x && dy >= min.y && dy <= max.y
            }
        }
    }

    /// Farthest pixel distance along either axis the marker reaches
    pub fn reach(&self) -> f64 {
        match self {
            PointMarker::Circle(radius) => *radius,
            PointMarker::Box { min, max } => [min.x, min.y, max.x, max.y]
                .iter()
                .fold(0.0_f64, |reach, v| reach.max(v.abs())),
        }
    }
}

/// Identifier of a feature within its source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureId(pub String);

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        FeatureId(value.to_string())
    }
}

/// Identity of a feature across the whole map
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureRef {
    pub layer_id: String,
    pub feature_id: FeatureId,
}

impl FeatureRef {
    pub fn new(layer_id: impl Into<String>, feature_id: FeatureId) -> Self {
        Self {
            layer_id: layer_id.into(),
            feature_id,
        }
    }
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.layer_id, self.feature_id)
    }
}

/// A geometry with attributes, as parsed from GeoJSON
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: FeatureId,
    pub geometry: Geometry,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: FeatureId(id.into()),
            geometry,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(name, value);
        self
    }

    /// Shorthand for [`Attributes::get`]
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }
}
