//! Vector layer styling: colors, strokes, fills, icons, and data-driven color
//! ramps.

use crate::{core::geo::Point, data::feature::Feature, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;

#[cfg(feature = "egui")]
use egui::Color32;

/// RGBA color, serialized as a CSS `rgba(...)` / `#rrggbb` string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// CSS-style alpha in `0.0..=1.0`
    pub fn rgba(r: u8, g: u8, b: u8, alpha: f32) -> Self {
        Self::new(r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    pub fn alpha(&self) -> f32 {
        self.a as f32 / 255.0
    }

    /// Scales the alpha channel, used for layer opacity
    pub fn with_opacity(self, opacity: f32) -> Self {
        Self {
            a: (self.a as f32 * opacity.clamp(0.0, 1.0)).round() as u8,
            ..self
        }
    }

    /// Linear blend from `self` (t = 0) to `other` (t = 1)
    pub fn lerp(&self, other: &Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Color::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    /// Parses `rgba(r, g, b, a)`, `rgb(r, g, b)`, `#rrggbb` and `#rrggbbaa`
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let invalid = || crate::Error::ParseError(format!("invalid color '{}'", text));

        if let Some(hex) = text.strip_prefix('#') {
            let channel = |i: usize| {
                hex.get(i..i + 2)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(invalid)
            };
            return match hex.len() {
                6 => Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
                8 => Ok(Color::new(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
                _ => Err(invalid().into()),
            };
        }

        let (body, has_alpha) = if let Some(body) = text.strip_prefix("rgba(") {
            (body, true)
        } else if let Some(body) = text.strip_prefix("rgb(") {
            (body, false)
        } else {
            return Err(invalid().into());
        };
        let parts: Vec<&str> = body
            .strip_suffix(')')
            .ok_or_else(invalid)?
            .split(',')
            .map(str::trim)
            .collect();

        let channel = |s: &str| s.parse::<u8>().map_err(|_| invalid());
        match (parts.as_slice(), has_alpha) {
            ([r, g, b, a], true) => {
                let alpha: f32 = a.parse().map_err(|_| invalid())?;
                Ok(Color::rgba(channel(*r)?, channel(*g)?, channel(*b)?, alpha))
            }
            ([r, g, b], false) => Ok(Color::rgb(channel(*r)?, channel(*g)?, channel(*b)?)),
            _ => Err(invalid().into()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, alpha_text(self.a))
    }
}

/// Shortest alpha decimal that parses back to the same byte
fn alpha_text(a: u8) -> String {
    let exact = |text: &str| {
        text.parse::<f32>()
            .map(|alpha| Color::rgba(0, 0, 0, alpha).a == a)
            .unwrap_or(false)
    };
    let text = (2..=4usize)
        .map(|digits| format!("{:.*}", digits, a as f32 / 255.0))
        .find(|text| exact(text))
        .unwrap_or_else(|| format!("{:.4}", a as f32 / 255.0));
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl TryFrom<String> for Color {
    type Error = crate::Error;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Color::parse(&value).map_err(|e| crate::Error::ParseError(e.to_string()))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

#[cfg(feature = "egui")]
impl From<Color> for Color32 {
    fn from(color: Color) -> Self {
        Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub color: Color,
}

/// Image drawn at point features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    /// Image path relative to the data root, or an `http(s)://` URL
    pub src: String,
    /// Fraction of the image size that sits on the point; `[0.5, 1.0]` is bottom-center
    #[serde(default = "Icon::default_anchor")]
    pub anchor: [f32; 2],
    #[serde(default = "Icon::default_scale")]
    pub scale: f32,
    /// Image size in pixels once decoded; drawn at `size * scale`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<[f32; 2]>,
}

impl Icon {
    pub fn new(src: impl Into<String>, scale: f32) -> Self {
        Self {
            src: src.into(),
            anchor: Self::default_anchor(),
            scale,
            size: None,
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.size = Some([width, height]);
        self
    }

    /// Drawn image box as `(min, max)` offsets from the point, if the size is known
    pub fn footprint(&self) -> Option<(Point, Point)> {
        let [width, height] = self.size?;
        let (w, h) = ((width * self.scale) as f64, (height * self.scale) as f64);
        let (ax, ay) = (self.anchor[0] as f64, self.anchor[1] as f64);
        Some((
            Point::new(-w * ax, -h * ay),
            Point::new(w * (1.0 - ax), h * (1.0 - ay)),
        ))
    }

    fn default_anchor() -> [f32; 2] {
        [0.5, 1.0]
    }

    fn default_scale() -> f32 {
        1.0
    }
}

/// How a single feature is drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default)]
    pub stroke: Option<Stroke>,
    #[serde(default)]
    pub fill: Option<Fill>,
    #[serde(default)]
    pub icon: Option<Icon>,
    /// Radius of the circle drawn for points without an icon (or while the
    /// icon is unavailable)
    #[serde(default = "Style::default_circle_radius")]
    pub circle_radius: f32,
}

impl Style {
    pub fn new() -> Self {
        Self {
            stroke: None,
            fill: None,
            icon: None,
            circle_radius: Self::default_circle_radius(),
        }
    }

    pub fn with_stroke(mut self, color: Color, width: f32) -> Self {
        self.stroke = Some(Stroke { color, width });
        self
    }

    pub fn with_fill(mut self, color: Color) -> Self {
        self.fill = Some(Fill { color });
        self
    }

    pub fn with_icon(mut self, icon: Icon) -> Self {
        self.icon = Some(icon);
        self
    }

    fn default_circle_radius() -> f32 {
        6.0
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorStop {
    pub value: f64,
    pub color: Color,
}

/// Fill color interpolated from one attribute over a color ramp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataDrivenStyle {
    pub attribute: String,
    pub stops: Vec<ColorStop>,
    /// Stroke, icon and the fill used when the attribute is missing
    pub base: Style,
}

impl DataDrivenStyle {
    /// Ramp color for a numeric value, clamped to the outermost stops
    pub fn color_for(&self, value: f64) -> Option<Color> {
        let first = self.stops.first()?;
        if value <= first.value || self.stops.len() == 1 {
            return Some(first.color);
        }
        for pair in self.stops.windows(2) {
            let (lo, hi) = (&pair[0], &pair[1]);
            if value <= hi.value {
                let span = hi.value - lo.value;
                let t = if span > 0.0 { (value - lo.value) / span } else { 1.0 };
                return Some(lo.color.lerp(&hi.color, t));
            }
        }
        self.stops.last().map(|stop| stop.color)
    }

    /// Text values are hashed to a stable position on the ramp
    fn color_for_text(&self, text: &str) -> Option<Color> {
        let (first, last) = (self.stops.first()?, self.stops.last()?);
        let mut hasher = fxhash::FxHasher::default();
        hasher.write(text.as_bytes());
        let t = (hasher.finish() % 1000) as f64 / 999.0;
        self.color_for(first.value + (last.value - first.value) * t)
    }

    pub fn resolve(&self, feature: &Feature) -> Style {
        let mut style = self.base.clone();
        let color = feature.get(&self.attribute).and_then(|value| {
            match value.as_f64() {
                Some(n) => self.color_for(n),
                None => value.display().and_then(|text| self.color_for_text(&text)),
            }
        });
        if let Some(color) = color {
            style.fill = Some(Fill { color });
        }
        style
    }
}

/// Style of a whole vector layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerStyle {
    Static(Style),
    DataDriven(DataDrivenStyle),
}

impl LayerStyle {
    pub fn resolve(&self, feature: &Feature) -> Style {
        match self {
            LayerStyle::Static(style) => style.clone(),
            LayerStyle::DataDriven(ramp) => ramp.resolve(feature),
        }
    }

    /// Icon shared by every feature of the layer, if any
    pub fn icon(&self) -> Option<&Icon> {
        match self {
            LayerStyle::Static(style) => style.icon.as_ref(),
            LayerStyle::DataDriven(ramp) => ramp.base.icon.as_ref(),
        }
    }

    pub fn icon_mut(&mut self) -> Option<&mut Icon> {
        match self {
            LayerStyle::Static(style) => style.icon.as_mut(),
            LayerStyle::DataDriven(ramp) => ramp.base.icon.as_mut(),
        }
    }

    /// White outline over a translucent blue fill, used for the Riau districts
    pub fn riau_polygons() -> Self {
        LayerStyle::Static(riau_base())
    }

    /// Riau districts colored by `OBJECTID`, light to dark blue
    pub fn riau_polygons_by_id() -> Self {
        let base = riau_base();
        LayerStyle::DataDriven(DataDrivenStyle {
            attribute: "OBJECTID".to_string(),
            stops: vec![
                ColorStop {
                    value: 1.0,
                    color: Color::rgba(198, 219, 239, 0.35),
                },
                ColorStop {
                    value: 200.0,
                    color: Color::rgba(8, 48, 107, 0.55),
                },
            ],
            base,
        })
    }

    pub fn rth_icons() -> Self {
        LayerStyle::Static(Style::new().with_icon(Icon::new("icon/rth.png", 0.13)))
    }

    pub fn flood_icons() -> Self {
        let mut style = Style::new()
            .with_icon(Icon::new("icon/flood.png", 0.1))
            .with_fill(Color::rgb(220, 38, 38))
            .with_stroke(Color::WHITE, 1.5);
        style.circle_radius = 7.0;
        LayerStyle::Static(style)
    }

    /// Glow drawn over the hovered feature
    pub fn highlight() -> Style {
        Style::new()
            .with_stroke(Color::rgba(255, 255, 255, 0.9), 3.0)
            .with_fill(Color::rgba(255, 255, 255, 0.1))
    }
}

fn riau_base() -> Style {
    Style::new()
        .with_stroke(Color::rgba(255, 255, 255, 0.7), 1.5)
        .with_fill(Color::rgba(51, 102, 255, 0.15))
}

impl Default for LayerStyle {
    fn default() -> Self {
        LayerStyle::Static(Style::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use crate::data::feature::Geometry;

    #[test]
    fn test_color_parsing() {
        assert_eq!(
            Color::parse("rgba(51, 102, 255, 0.15)").unwrap(),
            Color::new(51, 102, 255, 38)
        );
        assert_eq!(Color::parse("rgb(1,2,3)").unwrap(), Color::rgb(1, 2, 3));
        assert_eq!(Color::parse("#ff8000").unwrap(), Color::rgb(255, 128, 0));
        assert_eq!(Color::parse("#ff800080").unwrap(), Color::new(255, 128, 0, 128));
        assert!(Color::parse("blue").is_err());
        assert!(Color::parse("rgba(1, 2, 3)").is_err());
        assert!(Color::parse("#12345").is_err());
    }

    #[test]
    fn test_color_serde() {
        let color: Color = serde_json::from_str("\"rgba(255, 255, 255, 0.7)\"").unwrap();
        assert_eq!(color, Color::rgba(255, 255, 255, 0.7));
        assert_eq!(
            serde_json::to_string(&color).unwrap(),
            "\"rgba(255, 255, 255, 0.7)\""
        );
    }

    #[test]
    fn test_every_alpha_survives_serde() {
        for a in 0..=255u8 {
            let color = Color::new(10, 20, 30, a);
            let json = serde_json::to_string(&color).unwrap();
            let back: Color = serde_json::from_str(&json).unwrap();
            assert_eq!(back, color, "alpha {} written as {}", a, json);
        }
        assert_eq!(Color::rgb(1, 2, 3).to_string(), "rgba(1, 2, 3, 1)");
        assert_eq!(Color::new(1, 2, 3, 0).to_string(), "rgba(1, 2, 3, 0)");
    }

    #[test]
    fn test_icon_footprint() {
        let icon = Icon::new("icon/rth.png", 0.5).with_size(40.0, 80.0);
        assert_eq!(
            icon.footprint(),
            Some((Point::new(-10.0, -40.0), Point::new(10.0, 0.0)))
        );
        assert_eq!(Icon::new("icon/rth.png", 0.5).footprint(), None);
    }

    #[test]
    fn test_ramp_interpolation() {
        let LayerStyle::DataDriven(ramp) = LayerStyle::riau_polygons_by_id() else {
            panic!("expected a data-driven style");
        };
        let first = ramp.stops[0].color;
        let last = ramp.stops[1].color;

        assert_eq!(ramp.color_for(-5.0), Some(first));
        assert_eq!(ramp.color_for(1.0), Some(first));
        assert_eq!(ramp.color_for(200.0), Some(last));
        assert_eq!(ramp.color_for(1000.0), Some(last));
        assert_eq!(ramp.color_for(100.5), Some(first.lerp(&last, 0.5)));
    }

    #[test]
    fn test_data_driven_resolution() {
        let style = LayerStyle::riau_polygons_by_id();
        let polygon = || Geometry::Polygon(vec![vec![LatLng::new(0.0, 0.0)]]);

        let low = Feature::new("a", polygon()).with_attribute("OBJECTID", 1_i64);
        let high = Feature::new("b", polygon()).with_attribute("OBJECTID", 200_i64);
        let text = Feature::new("c", polygon()).with_attribute("OBJECTID", "Kampar");
        let same_text = Feature::new("e", polygon()).with_attribute("OBJECTID", "Kampar");
        let missing = Feature::new("d", polygon());

        let fill = |f: &Feature| style.resolve(f).fill.map(|fill| fill.color);
        assert_ne!(fill(&low), fill(&high));
        assert_eq!(fill(&text), fill(&same_text));
        assert!(fill(&text).is_some());
        assert_eq!(fill(&missing), Some(Color::rgba(51, 102, 255, 0.15)));
        assert!(style.resolve(&low).stroke.is_some());
    }

    #[test]
    fn test_layer_style_from_json() {
        let style: LayerStyle = serde_json::from_str(
            r#"{"kind": "static", "icon": {"src": "icon/rth.png", "scale": 0.13}}"#,
        )
        .unwrap();
        assert_eq!(style, LayerStyle::rth_icons());
        assert_eq!(style.icon().map(|i| i.anchor), Some([0.5, 1.0]));
    }
}
