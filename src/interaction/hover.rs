//! Hover highlight: at most one feature is mirrored into the highlight overlay.

use crate::{
    core::{constants::PLACEHOLDER, geo::Point, map::Map},
    data::feature::{Feature, FeatureId, FeatureRef},
    input::MapEvent,
};
use serde::{Deserialize, Serialize};

/// How the info label names the hovered feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfoProfile {
    /// Candidate attributes, first displayable one wins
    pub name_attributes: Vec<String>,
    /// Shown for a hovered feature without any of those attributes
    pub unnamed: String,
    /// Shown when nothing is hovered
    pub empty: String,
}

impl InfoProfile {
    pub fn label_for(&self, feature: &Feature) -> String {
        feature
            .attributes
            .text_or(&self.name_attributes, &self.unnamed)
    }
}

impl Default for InfoProfile {
    fn default() -> Self {
        Self {
            name_attributes: vec!["nama".to_string(), "DESA".to_string()],
            unnamed: "Fitur".to_string(),
            empty: PLACEHOLDER.to_string(),
        }
    }
}

/// What a pointer move did to the highlight
#[derive(Debug, Clone, PartialEq)]
pub enum HoverChange {
    /// A drag was in progress, nothing was queried
    Ignored,
    /// Same feature (or still nothing) under the pointer
    Unchanged,
    Changed {
        previous: Option<FeatureRef>,
        current: Option<FeatureRef>,
        label: String,
    },
}

/// Holds the single highlighted feature and the info label text
#[derive(Debug, Clone)]
pub struct HoverHighlighter {
    highlighted: Option<FeatureRef>,
    info: InfoProfile,
    label: String,
}

impl HoverHighlighter {
    pub fn new(info: InfoProfile) -> Self {
        let label = info.empty.clone();
        Self {
            highlighted: None,
            info,
            label,
        }
    }

    pub fn highlighted(&self) -> Option<&FeatureRef> {
        self.highlighted.as_ref()
    }

    /// Current info label
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn on_pointer_move(&mut self, map: &mut Map, pixel: Point, dragging: bool) -> HoverChange {
        if dragging {
            return HoverChange::Ignored;
        }

        let hovered = map
            .feature_at_pixel(pixel)
            .map(|hit| (hit.feature_ref(), hit.feature.clone()));
        let current = hovered.as_ref().map(|(feature_ref, _)| feature_ref.clone());
        if current == self.highlighted {
            return HoverChange::Unchanged;
        }

        let previous = self.highlighted.take();
        if let Some(overlay) = map.highlight_layer_mut() {
            if let Some(previous) = &previous {
                overlay.remove_feature(&overlay_id(previous));
            }
            if let Some((feature_ref, feature)) = &hovered {
                let mut copy = feature.clone();
                copy.id = overlay_id(feature_ref);
                overlay.add_feature(copy);
            }
        }

        self.label = match &hovered {
            Some((_, feature)) => self.info.label_for(feature),
            None => self.info.empty.clone(),
        };
        self.highlighted = current.clone();

        log::debug!(
            "highlight {} -> {}",
            previous.as_ref().map_or("none".to_string(), |r| r.to_string()),
            current.as_ref().map_or("none".to_string(), |r| r.to_string())
        );
        map.emit(MapEvent::HighlightChanged {
            feature: current.clone(),
        });

        HoverChange::Changed {
            previous,
            current,
            label: self.label.clone(),
        }
    }

    /// Drops the highlight, e.g. when its layer is hidden
    pub fn clear(&mut self, map: &mut Map) {
        if let Some(previous) = self.highlighted.take() {
            if let Some(overlay) = map.highlight_layer_mut() {
                overlay.remove_feature(&overlay_id(&previous));
            }
            self.label = self.info.empty.clone();
            map.emit(MapEvent::HighlightChanged { feature: None });
        }
    }
}

impl Default for HoverHighlighter {
    fn default() -> Self {
        Self::new(InfoProfile::default())
    }
}

/// Overlay copies are keyed by layer and feature so ids from different
/// layers cannot collide
fn overlay_id(feature_ref: &FeatureRef) -> FeatureId {
    FeatureId(feature_ref.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::LatLng;
    use crate::data::feature::Geometry;
    use crate::layers::vector::VectorLayer;

    fn map_with_point() -> Map {
        let mut map = Map::new(LatLng::new(0.0, 0.0), 8.0, Point::new(800.0, 600.0));
        let layer = VectorLayer::new("banjir".into(), "Banjir".into()).with_features(vec![
            Feature::new("p1", Geometry::Point(LatLng::new(0.0, 0.0)))
                .with_attribute("DESA", "Rumbai"),
        ]);
        map.add_layer(Box::new(layer)).unwrap();
        map
    }

    #[test]
    fn test_hover_enter_and_leave() {
        let mut map = map_with_point();
        let mut hover = HoverHighlighter::default();
        assert_eq!(hover.label(), "-");

        let change = hover.on_pointer_move(&mut map, Point::new(400.0, 300.0), false);
        assert!(matches!(change, HoverChange::Changed { .. }));
        assert_eq!(hover.label(), "Rumbai");
        assert_eq!(map.highlight_layer().unwrap().len(), 1);

        let change = hover.on_pointer_move(&mut map, Point::new(402.0, 301.0), false);
        assert_eq!(change, HoverChange::Unchanged);

        hover.on_pointer_move(&mut map, Point::new(10.0, 10.0), false);
        assert_eq!(hover.highlighted(), None);
        assert_eq!(hover.label(), "-");
        assert!(map.highlight_layer().unwrap().is_empty());
    }

    #[test]
    fn test_dragging_is_ignored() {
        let mut map = map_with_point();
        let mut hover = HoverHighlighter::default();

        let change = hover.on_pointer_move(&mut map, Point::new(400.0, 300.0), true);
        assert_eq!(change, HoverChange::Ignored);
        assert!(hover.highlighted().is_none());
        assert!(map.highlight_layer().unwrap().is_empty());
    }

    #[test]
    fn test_unnamed_feature_label() {
        let info = InfoProfile::default();
        let feature = Feature::new("x", Geometry::Point(LatLng::new(0.0, 0.0)));
        assert_eq!(info.label_for(&feature), "Fitur");
        let named = feature.with_attribute("nama", "Hutan Kota");
        assert_eq!(info.label_for(&named), "Hutan Kota");
    }

    #[test]
    fn test_clear_removes_overlay_copy() {
        let mut map = map_with_point();
        let mut hover = HoverHighlighter::default();
        hover.on_pointer_move(&mut map, Point::new(400.0, 300.0), false);
        hover.clear(&mut map);
        assert!(hover.highlighted().is_none());
        assert!(map.highlight_layer().unwrap().is_empty());
    }
}
