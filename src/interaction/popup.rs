//! Click popup: which feature was clicked, where the popup sits and what it says.

use crate::{
    core::{constants::PLACEHOLDER, geo::LatLng, geo::Point, map::Map},
    data::feature::{Feature, Geometry},
};
use serde::{Deserialize, Serialize};

/// How the popup position is derived from the clicked feature
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorStrategy {
    /// Wherever the user clicked
    #[default]
    ClickCoordinate,
    /// The point itself, the outer-ring vertex mean for polygons, else the click
    FeatureGeometry,
}

/// Popup coordinate for a feature clicked at `click`.
///
/// Polygons use the plain mean of the stored outer-ring vertices (closing
/// vertex included), which is not the area centroid.
pub fn popup_anchor(geometry: &Geometry, click: LatLng) -> LatLng {
    match geometry {
        Geometry::Point(point) => *point,
        Geometry::Polygon(_) => geometry.outer_ring_mean().unwrap_or(click),
        _ => click,
    }
}

/// One line below the popup title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupField {
    /// Short prefix such as an emoji or a label
    pub prefix: String,
    /// Candidate attributes, first displayable one wins
    pub attributes: Vec<String>,
    #[serde(default)]
    pub emphasis: bool,
}

impl PopupField {
    pub fn new(prefix: &str, attributes: &[&str], emphasis: bool) -> Self {
        Self {
            prefix: prefix.to_string(),
            attributes: attributes.iter().map(|a| a.to_string()).collect(),
            emphasis,
        }
    }
}

/// Which attributes a popup reads and where it is anchored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupProfile {
    #[serde(default)]
    pub anchor: AnchorStrategy,
    /// Candidate attributes for the heading
    pub title: Vec<String>,
    #[serde(default)]
    pub fields: Vec<PopupField>,
    #[serde(default = "PopupProfile::default_placeholder")]
    pub placeholder: String,
}

impl PopupProfile {
    /// Name, address and date of a green space, shown where the user clicked
    pub fn green_space() -> Self {
        Self {
            anchor: AnchorStrategy::ClickCoordinate,
            title: vec!["nama".to_string(), "Nama_Pemetaan".to_string()],
            fields: vec![
                PopupField::new("📍", &["alamat"], true),
                PopupField::new("📅", &["tanggal"], false),
            ],
            placeholder: Self::default_placeholder(),
        }
    }

    /// Flood point or district details, shown on the feature itself
    pub fn flood() -> Self {
        Self {
            anchor: AnchorStrategy::FeatureGeometry,
            title: vec![
                "Nama_Pemetaan".to_string(),
                "nama".to_string(),
                "DESA".to_string(),
            ],
            fields: vec![
                PopupField::new("Korban:", &["Jumlah_Korban"], true),
                PopupField::new("📅", &["tanggal"], false),
            ],
            placeholder: Self::default_placeholder(),
        }
    }

    fn default_placeholder() -> String {
        PLACEHOLDER.to_string()
    }

    pub fn content(&self, feature: &Feature) -> PopupContent {
        let attributes = &feature.attributes;
        PopupContent {
            title: attributes.text_or(&self.title, &self.placeholder),
            lines: self
                .fields
                .iter()
                .map(|field| PopupLine {
                    prefix: field.prefix.clone(),
                    text: attributes.text_or(&field.attributes, &self.placeholder),
                    emphasis: field.emphasis,
                })
                .collect(),
        }
    }
}

impl Default for PopupProfile {
    fn default() -> Self {
        Self::green_space()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupLine {
    pub prefix: String,
    pub text: String,
    pub emphasis: bool,
}

/// Resolved popup text
#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub title: String,
    pub lines: Vec<PopupLine>,
}

impl PopupContent {
    /// HTML fragment with every attribute value escaped
    pub fn to_html(&self) -> String {
        let mut html = String::from("<div style=\"padding:5px;\">\n");
        html.push_str(&format!(
            "  <h5 style=\"margin:0; font-weight:700;\">{}</h5>\n",
            escape_html(&self.title)
        ));
        for line in &self.lines {
            let text = escape_html(&line.text);
            let text = if line.emphasis {
                format!("<strong>{}</strong>", text)
            } else {
                text
            };
            html.push_str(&format!(
                "  <p style=\"margin:4px 0;\">{} {}</p>\n",
                escape_html(&line.prefix),
                text
            ));
        }
        html.push_str("</div>");
        html
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Popup placement and content; hidden while `position` is `None`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopupOverlay {
    position: Option<LatLng>,
    content: Option<PopupContent>,
}

impl PopupOverlay {
    pub fn show(&mut self, position: LatLng, content: PopupContent) {
        self.position = Some(position);
        self.content = Some(content);
    }

    pub fn hide(&mut self) {
        self.position = None;
    }

    pub fn position(&self) -> Option<LatLng> {
        self.position
    }

    /// Content of the last shown popup, kept while hidden
    pub fn content(&self) -> Option<&PopupContent> {
        self.content.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.position.is_some()
    }
}

/// Opens the popup on the clicked feature, or hides it on empty map
#[derive(Debug, Clone, Default)]
pub struct ClickPopup {
    profile: PopupProfile,
    overlay: PopupOverlay,
}

impl ClickPopup {
    pub fn new(profile: PopupProfile) -> Self {
        Self {
            profile,
            overlay: PopupOverlay::default(),
        }
    }

    /// Returns the new popup position, `None` when nothing was clicked
    pub fn on_click(&mut self, map: &Map, pixel: Point) -> Option<LatLng> {
        let Some(hit) = map.feature_at_pixel(pixel) else {
            self.overlay.hide();
            return None;
        };

        let click = map.viewport().pixel_to_lat_lng(&pixel);
        let position = match self.profile.anchor {
            AnchorStrategy::ClickCoordinate => click,
            AnchorStrategy::FeatureGeometry => popup_anchor(&hit.feature.geometry, click),
        };
        log::debug!("popup for {} at {:?}", hit.feature_ref(), position);

        self.overlay.show(position, self.profile.content(hit.feature));
        Some(position)
    }

    /// The close control: hides the popup regardless of state
    pub fn close(&mut self) {
        self.overlay.hide();
    }

    pub fn overlay(&self) -> &PopupOverlay {
        &self.overlay
    }

    pub fn profile(&self) -> &PopupProfile {
        &self.profile
    }

    pub fn set_profile(&mut self, profile: PopupProfile) {
        self.profile = profile;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shelter() -> Feature {
        Feature::new("1", Geometry::Point(LatLng::new(0.5, 101.4)))
            .with_attribute("nama", "Taman Kota")
            .with_attribute("alamat", "Jl. Merdeka")
            .with_attribute("tanggal", "2024-01-02")
    }

    #[test]
    fn test_point_anchor_is_the_point() {
        let geometry = Geometry::Point(LatLng::new(0.5, 101.4));
        assert_eq!(
            popup_anchor(&geometry, LatLng::new(9.0, 9.0)),
            LatLng::new(0.5, 101.4)
        );
    }

    #[test]
    fn test_polygon_anchor_is_ring_mean() {
        // [(0,0),(2,0),(2,2),(0,2)] as (lng, lat)
        let ring = vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(0.0, 2.0),
            LatLng::new(2.0, 2.0),
            LatLng::new(2.0, 0.0),
        ];
        let anchor = popup_anchor(&Geometry::Polygon(vec![ring]), LatLng::new(5.0, 5.0));
        assert_eq!(anchor, LatLng::new(1.0, 1.0));
    }

    #[test]
    fn test_other_geometry_falls_back_to_click() {
        let click = LatLng::new(0.1, 0.2);
        let line = Geometry::LineString(vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)]);
        assert_eq!(popup_anchor(&line, click), click);
        let empty = Geometry::Polygon(vec![]);
        assert_eq!(popup_anchor(&empty, click), click);
    }

    #[test]
    fn test_content_uses_fallbacks() {
        let profile = PopupProfile::green_space();
        let content = profile.content(&shelter());
        assert_eq!(content.title, "Taman Kota");
        assert_eq!(content.lines[0].text, "Jl. Merdeka");

        let bare = Feature::new("2", Geometry::Point(LatLng::new(0.0, 0.0)))
            .with_attribute("Nama_Pemetaan", "Banjir Rumbai")
            .with_attribute("alamat", "");
        let content = profile.content(&bare);
        assert_eq!(content.title, "Banjir Rumbai");
        assert_eq!(content.lines[0].text, "-");
        assert_eq!(content.lines[1].text, "-");
    }

    #[test]
    fn test_flood_profile_shows_zero_victims() {
        let feature = Feature::new("3", Geometry::Point(LatLng::new(0.0, 0.0)))
            .with_attribute("DESA", "Rumbai")
            .with_attribute("Jumlah_Korban", 0i64);
        let content = PopupProfile::flood().content(&feature);
        assert_eq!(content.title, "Rumbai");
        assert_eq!(content.lines[0].text, "0");
    }

    #[test]
    fn test_html_is_escaped() {
        let content = PopupContent {
            title: "<b>Taman & Hutan</b>".to_string(),
            lines: vec![PopupLine {
                prefix: "📍".to_string(),
                text: "Jl. \"Sudirman\"".to_string(),
                emphasis: true,
            }],
        };
        let html = content.to_html();
        assert!(html.contains("&lt;b&gt;Taman &amp; Hutan&lt;/b&gt;"));
        assert!(html.contains("<strong>Jl. &quot;Sudirman&quot;</strong>"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_overlay_close_keeps_content() {
        let mut overlay = PopupOverlay::default();
        overlay.show(LatLng::new(0.0, 0.0), PopupProfile::default().content(&shelter()));
        assert!(overlay.is_visible());
        overlay.hide();
        assert!(!overlay.is_visible());
        assert!(overlay.content().is_some());
    }
}
